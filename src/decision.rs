//! Compression-necessity policy
//!
//! An image needs compression when it is larger than the configured byte
//! limit, or when either side exceeds the configured resolution. Each limit
//! only applies when the caller opted into it with a non-zero value.

use crate::metadata::ImageMetadataReader;
use crate::models::{CompressionConfig, ImageMetrics, ImageReference};
use crate::Result;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct CompressionDecision {
    reader: Arc<dyn ImageMetadataReader>,
    config: CompressionConfig,
}

impl CompressionDecision {
    pub fn new(reader: Arc<dyn ImageMetadataReader>, config: CompressionConfig) -> Self {
        Self { reader, config }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Whether `image` must be compressed before it is returned to the caller.
    ///
    /// The size check runs first and short-circuits: an oversized image is
    /// never read for resolution. May block on I/O.
    pub fn is_compression_required(&self, image: &ImageReference) -> Result<bool> {
        if self.config.compression_enabled() && self.size_diff(image)? > 0 {
            debug!("{} exceeds {} bytes", image, self.config.max_size_bytes);
            return Ok(true);
        }

        if self.config.resolution_limited() {
            let (width, height) = self.reader.resolution(image)?;
            let oversized = width > self.config.max_width_px || height > self.config.max_height_px;
            debug!(
                "{} is {}x{} (limit {}x{}), oversized: {}",
                image,
                width,
                height,
                self.config.max_width_px,
                self.config.max_height_px,
                oversized
            );
            return Ok(oversized);
        }

        Ok(false)
    }

    /// Full metrics snapshot, for callers that want to log what was decided on.
    pub fn metrics(&self, image: &ImageReference) -> Result<ImageMetrics> {
        self.reader.metrics(image)
    }

    fn size_diff(&self, image: &ImageReference) -> Result<i128> {
        let size = self.reader.size(image)?;
        Ok(i128::from(size) - i128::from(self.config.max_size_bytes))
    }
}
