//! Data models and structures
//!
//! Defines the configuration, image handles and outcome types shared by the
//! decision, orchestration and hand-off steps.

use crate::handoff::file_uri;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Limits for one compression request. A zero limit means unconstrained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompressionConfig {
    #[serde(default)]
    pub max_width_px: u32,
    #[serde(default)]
    pub max_height_px: u32,
    #[serde(default)]
    pub max_size_bytes: u64,
    pub output_directory: PathBuf,
}

impl CompressionConfig {
    pub fn new(
        max_width_px: u32,
        max_height_px: u32,
        max_size_bytes: u64,
        output_directory: PathBuf,
    ) -> Self {
        Self {
            max_width_px,
            max_height_px,
            max_size_bytes,
            output_directory,
        }
    }

    pub fn compression_enabled(&self) -> bool {
        self.max_size_bytes > 0
    }

    pub fn resolution_limited(&self) -> bool {
        self.max_width_px > 0 && self.max_height_px > 0
    }

    /// Size ceiling handed to the engine, in whole kilobytes.
    ///
    /// Truncates: 1023 bytes is a ceiling of 0 KB.
    pub fn size_ceiling_kb(&self) -> u32 {
        u32::try_from(self.max_size_bytes / 1024).unwrap_or(u32::MAX)
    }
}

/// Caller-owned handle to a source image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    path: PathBuf,
}

impl ImageReference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Accepts either a plain path or a `file://` URI.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::Config("Empty image reference".to_string()));
        }

        match trimmed.strip_prefix(FILE_SCHEME) {
            Some(rest) => {
                // file://localhost/path and file:///path are equivalent
                let rest = rest.strip_prefix("localhost").unwrap_or(rest);
                if !rest.starts_with('/') {
                    return Err(Error::Config(format!(
                        "Unsupported file URI host in '{}'",
                        input
                    )));
                }
                let decoded = urlencoding::decode(rest)
                    .map_err(|e| Error::Config(format!("Invalid file URI '{}': {}", input, e)))?;
                Ok(Self::new(decoded.into_owned()))
            }
            None if trimmed.contains("://") => Err(Error::Config(format!(
                "Unsupported image reference scheme: {}",
                input
            ))),
            None => Ok(Self::new(trimmed)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tag passed back by engines to identify the source of a callback.
    pub fn source_tag(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Snapshot of an image's byte size and pixel resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetrics {
    pub size_bytes: u64,
    pub width_px: u32,
    pub height_px: u32,
}

/// Caller-visible failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    FailedToCompress,
    /// The source image could not be read; no compression was attempted.
    MetadataRead,
}

impl FailureReason {
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::FailedToCompress => "Failed to compress image",
            FailureReason::MetadataRead => "Failed to read image",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<FailureReason> for Error {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::FailedToCompress => Error::FailedToCompress,
            FailureReason::MetadataRead => Error::MetadataRead(reason.message().to_string()),
        }
    }
}

/// Terminal result of one compression attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionOutcome {
    Success(PathBuf),
    Failure(FailureReason),
}

impl CompressionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompressionOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<PathBuf> {
        match self {
            CompressionOutcome::Success(path) => Ok(path),
            CompressionOutcome::Failure(reason) => Err(reason.into()),
        }
    }
}

/// The image the caller should continue its workflow with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalImage {
    Original(ImageReference),
    Compressed(PathBuf),
}

impl FinalImage {
    pub fn path(&self) -> &Path {
        match self {
            FinalImage::Original(image) => image.path(),
            FinalImage::Compressed(path) => path,
        }
    }

    pub fn was_compressed(&self) -> bool {
        matches!(self, FinalImage::Compressed(_))
    }

    pub fn to_file_uri(&self) -> Result<String> {
        file_uri(self.path())
    }
}
