use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::extract::Extractor;
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError, OcrHint};
use crate::types::ParsedReceipt;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

impl From<PreprocessError> for PipelineError {
    fn from(e: PreprocessError) -> Self {
        match e {
            PreprocessError::Decode(e) => PipelineError::Decode(e),
            PreprocessError::Encode(msg) => PipelineError::Encode(msg),
        }
    }
}

/// Orchestrates: preprocess → OCR → normalize → extract → assemble.
///
/// Holds no per-scan state; one pipeline can serve any number of concurrent
/// scans.
pub struct ReceiptPipeline<R: OcrBackend + 'static> {
    recognizer: Arc<R>,
    config: ScanConfig,
    extractor: Extractor,
}

impl<R: OcrBackend + 'static> ReceiptPipeline<R> {
    pub fn new(recognizer: R, config: ScanConfig) -> Self {
        let extractor = Extractor::new(config.extraction.clone());
        Self { recognizer: Arc::new(recognizer), config, extractor }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Process an image file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ParsedReceipt, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "read receipt image");
        self.process_bytes(&bytes).await
    }

    /// Process raw image bytes (from camera capture or file read).
    ///
    /// Decoding, binarization and recognition run on the blocking pool and
    /// together are bounded by `ocr.timeout_secs`. A timeout only abandons the
    /// wait: the blocking task (and any engine process it started) runs to
    /// completion in the background and its result is dropped.
    pub async fn process_bytes(&self, data: &[u8]) -> Result<ParsedReceipt, PipelineError> {
        let text = self.recognize(data.to_vec()).await?;
        let receipt = self.parse_text(&text);
        info!(
            store = %receipt.store_name,
            date = %receipt.date,
            total = %receipt.total,
            items = receipt.items.len(),
            "receipt scanned"
        );
        Ok(receipt)
    }

    /// Extraction only, for OCR text obtained elsewhere. Never fails.
    pub fn parse_text(&self, ocr_text: &str) -> ParsedReceipt {
        self.extractor.extract(ocr_text)
    }

    async fn recognize(&self, data: Vec<u8>) -> Result<String, PipelineError> {
        let recognizer = Arc::clone(&self.recognizer);
        let preprocess_config = self.config.preprocess.clone();
        let hint = OcrHint::from(&self.config.ocr);
        let timeout_secs = self.config.ocr.timeout_secs;

        let job = tokio::task::spawn_blocking(move || -> Result<String, PipelineError> {
            let prepared = preprocess::prepare_for_ocr_from_bytes(&data, &preprocess_config)?;
            debug!(
                width = prepared.width(),
                height = prepared.height(),
                scale = prepared.scale(),
                "image binarized"
            );
            let png = prepared.to_png()?;
            Ok(recognizer.recognize(&png, &hint)?)
        });

        match tokio::time::timeout(Duration::from_secs(timeout_secs), job).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(OcrError::Engine(format!("OCR task failed: {join}")).into()),
            Err(_) => Err(OcrError::Timeout(timeout_secs).into()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
