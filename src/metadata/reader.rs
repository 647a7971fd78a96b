use super::ImageMetadataReader;
use crate::models::ImageReference;
use crate::{Error, Result};
use std::fs;

/// Reads metrics straight from the filesystem. Resolution comes from the
/// image header only; pixel data is never decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMetadataReader;

impl FsMetadataReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageMetadataReader for FsMetadataReader {
    fn size(&self, image: &ImageReference) -> Result<u64> {
        let metadata = fs::metadata(image.path()).map_err(|e| {
            Error::MetadataRead(format!("Failed to stat {}: {}", image, e))
        })?;

        if !metadata.is_file() {
            return Err(Error::MetadataRead(format!("{} is not a file", image)));
        }

        tracing::debug!("Read size of {}: {} bytes", image, metadata.len());
        Ok(metadata.len())
    }

    fn resolution(&self, image: &ImageReference) -> Result<(u32, u32)> {
        let (width, height) = image::image_dimensions(image.path()).map_err(|e| {
            Error::MetadataRead(format!("Failed to read resolution of {}: {}", image, e))
        })?;

        tracing::debug!("Read resolution of {}: {}x{}", image, width, height);
        Ok((width, height))
    }
}
