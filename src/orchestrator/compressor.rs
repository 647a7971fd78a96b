use super::ImageCompressor;
use crate::engine::{CompressListener, CompressionEngine};
use crate::models::{CompressionConfig, CompressionOutcome, FailureReason, ImageReference};
use crate::Error;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Drives one engine run per [`ImageCompressor::compress`] call.
///
/// There is no retry and no cancellation: the engine is launched exactly
/// once and the first terminal callback decides the outcome.
pub struct CompressionOrchestrator {
    engine: Arc<dyn CompressionEngine>,
    config: CompressionConfig,
}

impl CompressionOrchestrator {
    pub fn new(engine: Arc<dyn CompressionEngine>, config: CompressionConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }
}

#[async_trait]
impl ImageCompressor for CompressionOrchestrator {
    async fn compress(&self, image: &ImageReference) -> CompressionOutcome {
        let (tx, rx) = oneshot::channel();
        let size_ceiling_kb = self.config.size_ceiling_kb();

        info!(
            "Compressing {} (ceiling {} KB) into {}",
            image,
            size_ceiling_kb,
            self.config.output_directory.display()
        );
        self.engine.launch(
            image,
            size_ceiling_kb,
            &self.config.output_directory,
            Box::new(OutcomeLatch::new(image.source_tag(), tx)),
        );

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Engine released {} without a terminal callback", image);
                CompressionOutcome::Failure(FailureReason::FailedToCompress)
            }
        }
    }
}

/// Listener that forwards only the first terminal callback.
struct OutcomeLatch {
    source: String,
    settled: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<CompressionOutcome>>>,
}

impl OutcomeLatch {
    fn new(source: String, tx: oneshot::Sender<CompressionOutcome>) -> Self {
        Self {
            source,
            settled: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
        }
    }

    fn settle(&self, outcome: CompressionOutcome) {
        if self.settled.swap(true, Ordering::AcqRel) {
            warn!(
                "Ignoring extra terminal callback for {}: {:?}",
                self.source, outcome
            );
            return;
        }

        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx {
            if tx.send(outcome).is_err() {
                debug!("Caller stopped waiting for {}", self.source);
            }
        }
    }
}

impl CompressListener for OutcomeLatch {
    fn on_start(&self) {
        debug!("Compression started for {}", self.source);
    }

    fn on_success(&self, _source: Option<&str>, file: Option<PathBuf>) {
        match file {
            Some(file) => {
                info!("Compressed {} into {}", self.source, file.display());
                self.settle(CompressionOutcome::Success(file));
            }
            None => {
                warn!("Engine reported success for {} without a file", self.source);
                self.settle(CompressionOutcome::Failure(FailureReason::FailedToCompress));
            }
        }
    }

    fn on_error(&self, _source: Option<&str>, cause: Error) {
        warn!("Failed to compress {}: {}", self.source, cause);
        self.settle(CompressionOutcome::Failure(FailureReason::FailedToCompress));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineEvent, MockCompressionEngine};
    use pretty_assertions::assert_eq;

    const ONE_MB: u64 = 1_048_576;

    fn orchestrator(
        engine: &MockCompressionEngine,
        max_size_bytes: u64,
    ) -> CompressionOrchestrator {
        CompressionOrchestrator::new(
            Arc::new(engine.clone()),
            CompressionConfig::new(0, 0, max_size_bytes, PathBuf::from("/tmp/picked")),
        )
    }

    fn image() -> ImageReference {
        ImageReference::new("/tmp/source.jpg")
    }

    #[tokio::test]
    async fn test_success_yields_file() {
        let engine = MockCompressionEngine::succeeding("/tmp/picked/out.jpg");

        let outcome = orchestrator(&engine, ONE_MB).compress(&image()).await;

        assert_eq!(
            outcome,
            CompressionOutcome::Success(PathBuf::from("/tmp/picked/out.jpg"))
        );
    }

    #[tokio::test]
    async fn test_engine_receives_truncated_kb_and_verbatim_dir() {
        let engine = MockCompressionEngine::succeeding("/tmp/picked/out.jpg");

        orchestrator(&engine, ONE_MB).compress(&image()).await;
        orchestrator(&engine, 2047).compress(&image()).await;

        let launches = engine.get_launches();
        assert_eq!(launches[0].size_ceiling_kb, 1024);
        assert_eq!(launches[1].size_ceiling_kb, 1);
        assert_eq!(launches[0].output_dir, PathBuf::from("/tmp/picked"));
        assert_eq!(launches[0].image, image());
    }

    #[tokio::test]
    async fn test_success_without_file_is_failure() {
        let engine = MockCompressionEngine::new()
            .with_event(EngineEvent::Start)
            .with_event(EngineEvent::Success(None));

        let outcome = orchestrator(&engine, ONE_MB).compress(&image()).await;

        assert_eq!(
            outcome,
            CompressionOutcome::Failure(FailureReason::FailedToCompress)
        );
    }

    #[tokio::test]
    async fn test_error_is_failure() {
        let engine = MockCompressionEngine::failing("decoder exploded");

        let outcome = orchestrator(&engine, ONE_MB).compress(&image()).await;

        assert_eq!(
            outcome,
            CompressionOutcome::Failure(FailureReason::FailedToCompress)
        );
    }

    #[tokio::test]
    async fn test_only_first_terminal_callback_is_honored() {
        let engine = MockCompressionEngine::new()
            .with_event(EngineEvent::Start)
            .with_event(EngineEvent::Error("first".to_string()))
            .with_event(EngineEvent::Success(Some(PathBuf::from("/tmp/late.jpg"))));

        let outcome = orchestrator(&engine, ONE_MB).compress(&image()).await;

        assert_eq!(
            outcome,
            CompressionOutcome::Failure(FailureReason::FailedToCompress)
        );
    }

    #[tokio::test]
    async fn test_duplicate_success_keeps_first_file() {
        let engine = MockCompressionEngine::new()
            .with_event(EngineEvent::Success(Some(PathBuf::from("/tmp/first.jpg"))))
            .with_event(EngineEvent::Success(Some(PathBuf::from("/tmp/second.jpg"))))
            .with_async_delivery(true);

        let outcome = orchestrator(&engine, ONE_MB).compress(&image()).await;

        assert_eq!(
            outcome,
            CompressionOutcome::Success(PathBuf::from("/tmp/first.jpg"))
        );
    }

    #[tokio::test]
    async fn test_start_only_resolves_to_failure() {
        let engine = MockCompressionEngine::new().with_event(EngineEvent::Start);

        let outcome = orchestrator(&engine, ONE_MB).compress(&image()).await;

        assert_eq!(
            outcome,
            CompressionOutcome::Failure(FailureReason::FailedToCompress)
        );
        assert_eq!(engine.get_launch_count(), 1);
    }

    #[test]
    fn test_latch_settles_once() {
        let (tx, mut rx) = oneshot::channel();
        let latch = OutcomeLatch::new("src".to_string(), tx);

        latch.on_start();
        latch.on_success(None, Some(PathBuf::from("/tmp/a.jpg")));
        latch.on_error(None, Error::FailedToCompress);
        latch.on_success(None, None);

        assert_eq!(
            rx.try_recv().unwrap(),
            CompressionOutcome::Success(PathBuf::from("/tmp/a.jpg"))
        );
    }
}
