//! Delivery of the final image back to the controlling caller.

use crate::models::{CompressionOutcome, FailureReason};
use crate::Result;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tracing::error;

/// Receives exactly one terminal notification per request.
pub trait ResultHandler: Send + Sync {
    fn on_compressed(&self, file_uri: &str);
    fn on_error(&self, category: FailureReason);
}

/// Map an outcome onto the matching handler call.
pub fn deliver(outcome: CompressionOutcome, handler: &dyn ResultHandler) {
    match outcome {
        CompressionOutcome::Success(file) => match file_uri(&file) {
            Ok(uri) => handler.on_compressed(&uri),
            Err(e) => {
                error!("No locator for {}: {}", file.display(), e);
                handler.on_error(FailureReason::FailedToCompress);
            }
        },
        CompressionOutcome::Failure(reason) => handler.on_error(reason),
    }
}

/// `file://` locator for `path`, with each segment percent-encoded.
///
/// Relative paths are resolved against the working directory; if that
/// cannot be read the path has no valid locator and an error is returned.
pub fn file_uri(path: &Path) -> Result<String> {
    let absolute = absolute_from(path, std::env::current_dir)?;

    let mut uri = String::from("file://");
    for component in absolute.components() {
        match component {
            Component::Normal(segment) => {
                uri.push('/');
                uri.push_str(&urlencoding::encode(&segment.to_string_lossy()));
            }
            Component::ParentDir => uri.push_str("/.."),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    if uri.len() == "file://".len() {
        uri.push('/');
    }
    Ok(uri)
}

fn absolute_from(path: &Path, cwd: impl FnOnce() -> io::Result<PathBuf>) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(cwd()?.join(path))
}

/// What a [`RecordingResultHandler`] was told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Compressed(String),
    Error(FailureReason),
}

/// Handler that keeps every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingResultHandler {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingResultHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Delivery> {
        self.deliveries().pop()
    }

    fn record(&self, delivery: Delivery) {
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push(delivery);
        }
    }
}

impl ResultHandler for RecordingResultHandler {
    fn on_compressed(&self, file_uri: &str) {
        self.record(Delivery::Compressed(file_uri.to_string()));
    }

    fn on_error(&self, category: FailureReason) {
        self.record(Delivery::Error(category));
    }
}
