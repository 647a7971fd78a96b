//! Single-outcome compression
//!
//! Turns a callback-driven [`crate::engine::CompressionEngine`] run into one
//! awaited [`CompressionOutcome`].

pub mod compressor;
pub mod mock;

pub use compressor::CompressionOrchestrator;
pub use mock::MockImageCompressor;

use crate::models::{CompressionOutcome, ImageReference};
use async_trait::async_trait;

#[async_trait]
pub trait ImageCompressor: Send + Sync {
    async fn compress(&self, image: &ImageReference) -> CompressionOutcome;
}
