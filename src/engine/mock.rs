use super::{CompressListener, CompressionEngine};
use crate::models::ImageReference;
use crate::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One scripted listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Start,
    Success(Option<PathBuf>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub image: ImageReference,
    pub size_ceiling_kb: u32,
    pub output_dir: PathBuf,
}

/// Replays a fixed callback script for every launch.
///
/// An empty script drops the listener without any callback.
#[derive(Clone)]
pub struct MockCompressionEngine {
    script: Arc<Mutex<Vec<EngineEvent>>>,
    launches: Arc<Mutex<Vec<Launch>>>,
    deliver_async: bool,
}

impl MockCompressionEngine {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Vec::new())),
            launches: Arc::new(Mutex::new(Vec::new())),
            deliver_async: false,
        }
    }

    /// Engine that starts and then succeeds with `file`.
    pub fn succeeding(file: impl Into<PathBuf>) -> Self {
        Self::new()
            .with_event(EngineEvent::Start)
            .with_event(EngineEvent::Success(Some(file.into())))
    }

    /// Engine that starts and then fails.
    pub fn failing(cause: &str) -> Self {
        Self::new()
            .with_event(EngineEvent::Start)
            .with_event(EngineEvent::Error(cause.to_string()))
    }

    pub fn with_event(self, event: EngineEvent) -> Self {
        self.script.lock().unwrap().push(event);
        self
    }

    /// Deliver callbacks from a spawned tokio task instead of inline.
    pub fn with_async_delivery(mut self, deliver_async: bool) -> Self {
        self.deliver_async = deliver_async;
        self
    }

    pub fn get_launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn get_launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }

    fn replay(script: &[EngineEvent], source: &str, listener: &dyn CompressListener) {
        for event in script {
            match event {
                EngineEvent::Start => listener.on_start(),
                EngineEvent::Success(file) => listener.on_success(Some(source), file.clone()),
                EngineEvent::Error(cause) => {
                    listener.on_error(Some(source), Error::Invariant(cause.clone()))
                }
            }
        }
    }
}

impl Default for MockCompressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionEngine for MockCompressionEngine {
    fn launch(
        &self,
        image: &ImageReference,
        size_ceiling_kb: u32,
        output_dir: &Path,
        listener: Box<dyn CompressListener>,
    ) {
        self.launches.lock().unwrap().push(Launch {
            image: image.clone(),
            size_ceiling_kb,
            output_dir: output_dir.to_path_buf(),
        });

        let script = self.script.lock().unwrap().clone();
        let source = image.source_tag();
        if self.deliver_async {
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                Self::replay(&script, &source, listener.as_ref());
            });
        } else {
            Self::replay(&script, &source, listener.as_ref());
        }
    }
}
