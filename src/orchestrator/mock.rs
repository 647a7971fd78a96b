use super::ImageCompressor;
use crate::models::{CompressionOutcome, FailureReason, ImageReference};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockImageCompressor {
    outcome: Arc<Mutex<CompressionOutcome>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockImageCompressor {
    pub fn new() -> Self {
        Self {
            outcome: Arc::new(Mutex::new(CompressionOutcome::Success(PathBuf::from(
                "/tmp/compressed.jpg",
            )))),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_output(self, file: impl Into<PathBuf>) -> Self {
        *self.outcome.lock().unwrap() = CompressionOutcome::Success(file.into());
        self
    }

    pub fn with_failure(self) -> Self {
        *self.outcome.lock().unwrap() =
            CompressionOutcome::Failure(FailureReason::FailedToCompress);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockImageCompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageCompressor for MockImageCompressor {
    async fn compress(&self, _image: &ImageReference) -> CompressionOutcome {
        *self.call_count.lock().unwrap() += 1;
        self.outcome.lock().unwrap().clone()
    }
}
