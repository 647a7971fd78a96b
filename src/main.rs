use anyhow::{Context, Result};
use clap::Parser;
use picker_compress::engine::ImageCompressionEngine;
use picker_compress::handoff::{Delivery, RecordingResultHandler};
use picker_compress::metadata::FsMetadataReader;
use picker_compress::models::ImageReference;
use picker_compress::options::{
    RequestOptions, Settings, EXTRA_IMAGE_MAX_SIZE, EXTRA_MAX_HEIGHT, EXTRA_MAX_WIDTH,
    EXTRA_SAVE_DIRECTORY,
};
use picker_compress::provider::CompressionProvider;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "picker-compress")]
#[command(about = "Shrink a picked image to fit size and resolution limits")]
struct CliArgs {
    /// Image path or file:// URI.
    #[arg(value_name = "IMAGE")]
    image: String,

    /// Maximum width in pixels (0 = unconstrained).
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum height in pixels (0 = unconstrained).
    #[arg(long)]
    max_height: Option<u32>,

    /// Maximum file size in bytes (0 = no size limit).
    #[arg(long)]
    max_size: Option<u64>,

    /// Directory compressed images are written to.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// JSON file with request options; flags take precedence.
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,
}

impl CliArgs {
    fn request_options(&self) -> Result<RequestOptions> {
        let base = match &self.options {
            Some(path) => RequestOptions::from_json_file(path)
                .with_context(|| format!("Failed to load options from {}", path.display()))?,
            None => RequestOptions::new(),
        };

        let mut flags = RequestOptions::new();
        if let Some(width) = self.max_width {
            flags = flags.with(EXTRA_MAX_WIDTH, width);
        }
        if let Some(height) = self.max_height {
            flags = flags.with(EXTRA_MAX_HEIGHT, height);
        }
        if let Some(size) = self.max_size {
            flags = flags.with(EXTRA_IMAGE_MAX_SIZE, size);
        }
        if let Some(dir) = &self.output_dir {
            flags = flags.with(EXTRA_SAVE_DIRECTORY, dir.display());
        }

        Ok(base.merged(flags))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picker_compress=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let settings = Settings::from_env()?;
    let config = args.request_options()?.to_config(&settings)?;
    let image = ImageReference::parse(&args.image)?;

    let provider = CompressionProvider::new(
        Arc::new(FsMetadataReader::new()),
        Arc::new(ImageCompressionEngine::new()),
        config,
    );
    let handler = RecordingResultHandler::new();
    provider.process(&image, &handler).await;

    match handler.last() {
        Some(Delivery::Compressed(uri)) => {
            info!("Final image ready");
            println!("{}", uri);
            Ok(())
        }
        Some(Delivery::Error(category)) => {
            error!("{}", category);
            std::process::exit(1);
        }
        None => {
            error!("No result was delivered for {}", image);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_become_request_options() {
        let args = CliArgs::parse_from([
            "picker-compress",
            "photo.jpg",
            "--max-width",
            "1080",
            "--max-size",
            "1048576",
        ]);

        let options = args.request_options().unwrap();
        assert_eq!(options.get(EXTRA_MAX_WIDTH), Some("1080"));
        assert_eq!(options.get(EXTRA_IMAGE_MAX_SIZE), Some("1048576"));
        assert_eq!(options.get(EXTRA_MAX_HEIGHT), None);
    }

    #[test]
    fn test_flags_override_options_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"extra.max_width": 640, "extra.max_height": 480}"#).unwrap();

        let args = CliArgs::parse_from([
            "picker-compress",
            "photo.jpg",
            "--options",
            path.to_str().unwrap(),
            "--max-width",
            "800",
        ]);

        let options = args.request_options().unwrap();
        assert_eq!(options.get(EXTRA_MAX_WIDTH), Some("800"));
        assert_eq!(options.get(EXTRA_MAX_HEIGHT), Some("480"));
    }
}
