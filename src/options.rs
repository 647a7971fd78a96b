//! Request option extraction
//!
//! Callers pass their limits as a loosely typed string bundle. Missing keys
//! fall back to process-level [`Settings`], which in turn default to "no
//! limit".

use crate::models::CompressionConfig;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXTRA_MAX_WIDTH: &str = "extra.max_width";
pub const EXTRA_MAX_HEIGHT: &str = "extra.max_height";
pub const EXTRA_IMAGE_MAX_SIZE: &str = "extra.image_max_size";
pub const EXTRA_SAVE_DIRECTORY: &str = "extra.save_directory";

/// Process-level defaults, read once from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub max_width_px: u32,
    pub max_height_px: u32,
    pub max_size_bytes: u64,
    pub save_directory: Option<PathBuf>,
}

impl Settings {
    /// Read settings, loading a `.env` file from the working directory when
    /// one exists. A `.env` that exists but cannot be parsed is an error.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Self::from_process_env()
    }

    /// Like [`Self::from_env`], but `path` must exist and parse.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        dotenvy::from_path(path)?;
        Self::from_process_env()
    }

    fn from_process_env() -> Result<Self> {
        Ok(Self {
            max_width_px: env_number("PICKER_MAX_WIDTH")?.unwrap_or(0),
            max_height_px: env_number("PICKER_MAX_HEIGHT")?.unwrap_or(0),
            max_size_bytes: env_number("PICKER_MAX_SIZE")?.unwrap_or(0),
            save_directory: std::env::var("PICKER_SAVE_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn env_number<T: TryFrom<i64>>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => parse_limit(key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

/// Caller-supplied option bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    values: HashMap<String, String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Load a flat JSON object; numbers and strings are both accepted.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let object: HashMap<String, Value> = serde_json::from_str(json)?;
        let mut options = Self::new();
        for (key, value) in object {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Null => continue,
                other => {
                    return Err(Error::Config(format!(
                        "Option '{}' must be a string or number, got {}",
                        key, other
                    )))
                }
            };
            options.values.insert(key, value);
        }
        Ok(options)
    }

    /// Merge `other` on top of `self`; keys in `other` win.
    pub fn merged(mut self, other: RequestOptions) -> Self {
        self.values.extend(other.values);
        self
    }

    /// Build the immutable per-request config, creating the output directory.
    pub fn to_config(&self, settings: &Settings) -> Result<CompressionConfig> {
        let max_width_px = self.limit(EXTRA_MAX_WIDTH)?.unwrap_or(settings.max_width_px);
        let max_height_px = self
            .limit(EXTRA_MAX_HEIGHT)?
            .unwrap_or(settings.max_height_px);
        let max_size_bytes = self
            .limit(EXTRA_IMAGE_MAX_SIZE)?
            .unwrap_or(settings.max_size_bytes);

        let requested_dir = self
            .get(EXTRA_SAVE_DIRECTORY)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| settings.save_directory.clone());
        let output_directory = resolve_output_dir(requested_dir.as_deref())?;

        Ok(CompressionConfig::new(
            max_width_px,
            max_height_px,
            max_size_bytes,
            output_directory,
        ))
    }

    fn limit<T: TryFrom<i64>>(&self, key: &str) -> Result<Option<T>> {
        self.get(key).map(|raw| parse_limit(key, raw)).transpose()
    }
}

fn parse_limit<T: TryFrom<i64>>(key: &str, raw: &str) -> Result<T> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be an integer, got '{}'", key, raw)))?;
    if value < 0 {
        return Err(Error::Config(format!("{} must be >= 0, got {}", key, value)));
    }
    T::try_from(value).map_err(|_| Error::Config(format!("{} is out of range: {}", key, value)))
}

pub fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("picker-compress").join("images")
}

/// Use `requested` (or the default directory), creating it when missing.
pub fn resolve_output_dir(requested: Option<&Path>) -> Result<PathBuf> {
    let dir = requested
        .map(Path::to_path_buf)
        .unwrap_or_else(default_output_dir);

    if !dir.is_dir() {
        fs::create_dir_all(&dir)?;
        info!("Created output directory: {}", dir.display());
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_malformed_env_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "PICKER MAX WIDTH 100\n").unwrap();

        let err = Settings::from_env_file(&path).unwrap_err();
        assert!(matches!(err, Error::EnvVar(_)));
    }

    #[test]
    fn test_missing_explicit_env_file_is_rejected() {
        let dir = TempDir::new().unwrap();

        let err = Settings::from_env_file(&dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, Error::EnvVar(_)));
    }

    #[test]
    fn test_defaults_are_unconstrained() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            save_directory: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };

        let config = RequestOptions::new().to_config(&settings).unwrap();

        assert_eq!(
            config,
            CompressionConfig::new(0, 0, 0, dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_request_values_override_settings() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            max_width_px: 100,
            max_height_px: 100,
            max_size_bytes: 10,
            save_directory: None,
        };

        let config = RequestOptions::new()
            .with(EXTRA_MAX_WIDTH, 1080)
            .with(EXTRA_MAX_HEIGHT, 1920)
            .with(EXTRA_IMAGE_MAX_SIZE, 1_048_576)
            .with(EXTRA_SAVE_DIRECTORY, dir.path().display())
            .to_config(&settings)
            .unwrap();

        assert_eq!(config.max_width_px, 1080);
        assert_eq!(config.max_height_px, 1920);
        assert_eq!(config.max_size_bytes, 1_048_576);
        assert_eq!(config.output_directory, dir.path().to_path_buf());
    }

    #[test]
    fn test_settings_fill_missing_keys() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            max_width_px: 640,
            max_height_px: 480,
            max_size_bytes: 2048,
            save_directory: Some(dir.path().to_path_buf()),
        };

        let config = RequestOptions::new()
            .with(EXTRA_MAX_WIDTH, 800)
            .to_config(&settings)
            .unwrap();

        assert_eq!(config.max_width_px, 800);
        assert_eq!(config.max_height_px, 480);
        assert_eq!(config.max_size_bytes, 2048);
    }

    #[test]
    fn test_rejects_malformed_and_negative_limits() {
        let settings = Settings::default();

        let err = RequestOptions::new()
            .with(EXTRA_MAX_WIDTH, "wide")
            .to_config(&settings)
            .unwrap_err();
        assert!(err.to_string().contains(EXTRA_MAX_WIDTH));

        let err = RequestOptions::new()
            .with(EXTRA_IMAGE_MAX_SIZE, -1)
            .to_config(&settings)
            .unwrap_err();
        assert!(err.to_string().contains(">= 0"));

        let err = RequestOptions::new()
            .with(EXTRA_MAX_HEIGHT, u64::from(u32::MAX) + 1)
            .to_config(&settings)
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_output_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        let resolved = resolve_output_dir(Some(&nested)).unwrap();

        assert_eq!(resolved, nested);
        assert!(nested.is_dir());
    }

    #[test]
    fn test_from_json_accepts_numbers_and_strings() {
        let options = RequestOptions::from_json_str(
            r#"{"extra.max_width": 1024, "extra.max_height": "768", "extra.save_directory": null}"#,
        )
        .unwrap();

        assert_eq!(options.get(EXTRA_MAX_WIDTH), Some("1024"));
        assert_eq!(options.get(EXTRA_MAX_HEIGHT), Some("768"));
        assert_eq!(options.get(EXTRA_SAVE_DIRECTORY), None);
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        let err = RequestOptions::from_json_str(r#"{"extra.max_width": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_merged_prefers_other() {
        let base = RequestOptions::new()
            .with(EXTRA_MAX_WIDTH, 1)
            .with(EXTRA_MAX_HEIGHT, 2);
        let merged = base.merged(RequestOptions::new().with(EXTRA_MAX_WIDTH, 3));

        assert_eq!(merged.get(EXTRA_MAX_WIDTH), Some("3"));
        assert_eq!(merged.get(EXTRA_MAX_HEIGHT), Some("2"));
    }
}
