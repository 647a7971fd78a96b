//! Decision, compression and hand-off chained for one picked image.

use crate::decision::CompressionDecision;
use crate::engine::CompressionEngine;
use crate::handoff::ResultHandler;
use crate::metadata::ImageMetadataReader;
use crate::models::{CompressionConfig, FailureReason, FinalImage, ImageReference};
use crate::orchestrator::{CompressionOrchestrator, ImageCompressor};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{error, info};

pub struct CompressionProvider {
    decision: CompressionDecision,
    compressor: Arc<dyn ImageCompressor>,
}

impl CompressionProvider {
    pub fn new(
        reader: Arc<dyn ImageMetadataReader>,
        engine: Arc<dyn CompressionEngine>,
        config: CompressionConfig,
    ) -> Self {
        let compressor = Arc::new(CompressionOrchestrator::new(engine, config.clone()));
        Self::with_compressor(CompressionDecision::new(reader, config), compressor)
    }

    /// Build a provider around an existing compressor.
    ///
    /// Mainly useful for tests that inject a mock compressor.
    pub fn with_compressor(
        decision: CompressionDecision,
        compressor: Arc<dyn ImageCompressor>,
    ) -> Self {
        Self {
            decision,
            compressor,
        }
    }

    pub fn config(&self) -> &CompressionConfig {
        self.decision.config()
    }

    /// Resolve the image the caller should continue with.
    ///
    /// Images within every limit come back untouched; anything else is
    /// compressed once.
    pub async fn prepare(&self, image: &ImageReference) -> Result<FinalImage> {
        let decision = self.decision.clone();
        let source = image.clone();
        let required =
            tokio::task::spawn_blocking(move || decision.is_compression_required(&source))
                .await
                .map_err(|e| Error::Invariant(format!("Decision task join error: {}", e)))??;

        if !required {
            info!("{} is within limits, no compression needed", image);
            return Ok(FinalImage::Original(image.clone()));
        }

        let file = self.compressor.compress(image).await.into_result()?;
        Ok(FinalImage::Compressed(file))
    }

    /// Run [`Self::prepare`] and report the result to `handler`.
    pub async fn process(&self, image: &ImageReference, handler: &dyn ResultHandler) {
        match self
            .prepare(image)
            .await
            .and_then(|final_image| final_image.to_file_uri())
        {
            Ok(uri) => handler.on_compressed(&uri),
            Err(e) => {
                error!("Could not prepare {}: {}", image, e);
                handler.on_error(failure_category(&e));
            }
        }
    }
}

/// Metadata read failures keep their own category; everything else is a compression failure.
fn failure_category(error: &Error) -> FailureReason {
    match error {
        Error::MetadataRead(_) => FailureReason::MetadataRead,
        _ => FailureReason::FailedToCompress,
    }
}
