use super::{CompressListener, CompressionEngine};
use crate::models::ImageReference;
use crate::{Error, Result};
use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;
use uuid::Uuid;

const DEFAULT_QUALITY: u8 = 60;
const TARGET_LONG_SIDE: u32 = 1280;

/// Compresses on the tokio blocking pool using the `image` crate.
///
/// Oversized images are downsampled by [`sample_size`] and re-encoded as
/// JPEG. Must be launched from within a tokio runtime.
pub struct ImageCompressionEngine {
    quality: u8,
}

impl ImageCompressionEngine {
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    fn compress_sync(
        source: &Path,
        size_ceiling_kb: u32,
        output_dir: &Path,
        quality: u8,
    ) -> Result<PathBuf> {
        let size = fs::metadata(source)?.len();
        if !needs_compress(size, size_ceiling_kb) {
            tracing::debug!(
                "{} is within {} KB, returning it untouched",
                source.display(),
                size_ceiling_kb
            );
            return Ok(source.to_path_buf());
        }

        let img = load_oriented(source)?;
        let sample = sample_size(img.width(), img.height());
        let img = if sample > 1 {
            let width = (img.width() / sample).max(1);
            let height = (img.height() / sample).max(1);
            img.resize_exact(width, height, FilterType::Triangle)
        } else {
            img
        };

        let target = output_dir.join(output_file_name());
        // Only a fully encoded file is renamed into place.
        let staged = tempfile::Builder::new()
            .prefix(".compress-")
            .suffix(".jpg")
            .tempfile_in(output_dir)?;
        {
            let mut writer = BufWriter::new(staged.as_file());
            JpegEncoder::new_with_quality(&mut writer, quality).encode_image(&img.to_rgb8())?;
            writer.flush()?;
        }
        staged
            .persist(&target)
            .map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Compressed {} ({} bytes, sample size {}) into {}",
            source.display(),
            size,
            sample,
            target.display()
        );
        Ok(target)
    }
}

impl Default for ImageCompressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionEngine for ImageCompressionEngine {
    fn launch(
        &self,
        image: &ImageReference,
        size_ceiling_kb: u32,
        output_dir: &Path,
        listener: Box<dyn CompressListener>,
    ) {
        let source_tag = image.source_tag();

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                listener.on_error(
                    Some(&source_tag),
                    Error::Invariant(format!("No tokio runtime to compress on: {}", e)),
                );
                return;
            }
        };

        listener.on_start();

        let source = image.path().to_path_buf();
        let output_dir = output_dir.to_path_buf();
        let quality = self.quality;
        handle.spawn_blocking(move || {
            match Self::compress_sync(&source, size_ceiling_kb, &output_dir, quality) {
                Ok(file) => listener.on_success(Some(&source_tag), Some(file)),
                Err(e) => listener.on_error(Some(&source_tag), e),
            }
        });
    }
}

/// A ceiling of zero compresses everything.
fn needs_compress(size_bytes: u64, size_ceiling_kb: u32) -> bool {
    size_ceiling_kb == 0 || size_bytes > u64::from(size_ceiling_kb) << 10
}

fn load_oriented(source: &Path) -> Result<DynamicImage> {
    let mut decoder = ImageReader::open(source)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

fn output_file_name() -> String {
    format!(
        "{}_{}.jpg",
        Local::now().format("%Y%m%d_%H%M%S%3f"),
        Uuid::new_v4().simple()
    )
}

/// Integer downsampling factor for an image of `width` x `height`.
///
/// Near-square images step down in coarse buckets; long panoramas are scaled
/// so the long side lands around 1280 px relative to the aspect ratio.
pub fn sample_size(width: u32, height: u32) -> u32 {
    let width = width.saturating_add(width % 2);
    let height = height.saturating_add(height % 2);
    let long_side = width.max(height);
    let short_side = width.min(height);
    if long_side == 0 {
        return 1;
    }

    let scale = short_side as f64 / long_side as f64;
    if scale <= 1.0 && scale > 0.5625 {
        if long_side < 1664 {
            1
        } else if long_side < 4990 {
            2
        } else if long_side > 4990 && long_side < 10240 {
            4
        } else {
            (long_side / TARGET_LONG_SIDE).max(1)
        }
    } else if scale <= 0.5625 && scale > 0.5 {
        (long_side / TARGET_LONG_SIDE).max(1)
    } else {
        ((long_side as f64 / (TARGET_LONG_SIDE as f64 / scale)).ceil() as u32).max(1)
    }
}
