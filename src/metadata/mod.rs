//! Image metadata reading
//!
//! Reads the byte size and pixel resolution of a source image. Reads may
//! block on I/O and should be kept off latency-sensitive threads.

pub mod mock;
pub mod reader;

pub use mock::MockMetadataReader;
pub use reader::FsMetadataReader;

use crate::models::{ImageMetrics, ImageReference};
use crate::Result;

pub trait ImageMetadataReader: Send + Sync {
    fn size(&self, image: &ImageReference) -> Result<u64>;
    fn resolution(&self, image: &ImageReference) -> Result<(u32, u32)>;

    fn metrics(&self, image: &ImageReference) -> Result<ImageMetrics> {
        let size_bytes = self.size(image)?;
        let (width_px, height_px) = self.resolution(image)?;
        Ok(ImageMetrics {
            size_bytes,
            width_px,
            height_px,
        })
    }
}
