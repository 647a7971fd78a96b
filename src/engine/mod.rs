//! Bitmap compression engines
//!
//! Engines report back through a three-phase listener: a start notification
//! followed by at most one success or error callback. Callers that need a
//! single terminal result wrap the listener, see
//! [`crate::orchestrator::CompressionOrchestrator`].

pub mod image_engine;
pub mod mock;

pub use image_engine::ImageCompressionEngine;
pub use mock::{EngineEvent, MockCompressionEngine};

use crate::models::ImageReference;
use crate::Error;
use std::path::{Path, PathBuf};

pub trait CompressListener: Send + Sync {
    fn on_start(&self);
    fn on_success(&self, source: Option<&str>, file: Option<PathBuf>);
    fn on_error(&self, source: Option<&str>, cause: Error);
}

pub trait CompressionEngine: Send + Sync {
    /// Start compressing `image` in the background.
    ///
    /// Files at or below `size_ceiling_kb` are left alone. Output lands in
    /// `output_dir`, which must already exist.
    fn launch(
        &self,
        image: &ImageReference,
        size_ceiling_kb: u32,
        output_dir: &Path,
        listener: Box<dyn CompressListener>,
    );
}
