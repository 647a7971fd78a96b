use super::ImageMetadataReader;
use crate::models::{ImageMetrics, ImageReference};
use crate::{Error, Result};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockMetadataReader {
    metrics: Arc<Mutex<ImageMetrics>>,
    size_calls: Arc<Mutex<usize>>,
    resolution_calls: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockMetadataReader {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(Mutex::new(ImageMetrics {
                size_bytes: 0,
                width_px: 0,
                height_px: 0,
            })),
            size_calls: Arc::new(Mutex::new(0)),
            resolution_calls: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_size(self, size_bytes: u64) -> Self {
        self.metrics.lock().unwrap().size_bytes = size_bytes;
        self
    }

    pub fn with_resolution(self, width_px: u32, height_px: u32) -> Self {
        {
            let mut metrics = self.metrics.lock().unwrap();
            metrics.width_px = width_px;
            metrics.height_px = height_px;
        }
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_size_calls(&self) -> usize {
        *self.size_calls.lock().unwrap()
    }

    pub fn get_resolution_calls(&self) -> usize {
        *self.resolution_calls.lock().unwrap()
    }
}

impl Default for MockMetadataReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageMetadataReader for MockMetadataReader {
    fn size(&self, image: &ImageReference) -> Result<u64> {
        *self.size_calls.lock().unwrap() += 1;

        if *self.should_fail.lock().unwrap() {
            return Err(Error::MetadataRead(format!("Mock failure for {}", image)));
        }
        Ok(self.metrics.lock().unwrap().size_bytes)
    }

    fn resolution(&self, image: &ImageReference) -> Result<(u32, u32)> {
        *self.resolution_calls.lock().unwrap() += 1;

        if *self.should_fail.lock().unwrap() {
            return Err(Error::MetadataRead(format!("Mock failure for {}", image)));
        }
        let metrics = self.metrics.lock().unwrap();
        Ok((metrics.width_px, metrics.height_px))
    }
}
