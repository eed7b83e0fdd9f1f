use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::config::OcrConfig;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR engine timed out after {0}s")]
    Timeout(u64),
    #[error("Tesseract not available: build with the `tesseract` feature")]
    NotAvailable,
}

/// Language and layout hint passed along with the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrHint {
    pub language: String,
    /// Tesseract page segmentation mode.
    pub page_segmentation: u8,
}

impl Default for OcrHint {
    fn default() -> Self {
        Self { language: "eng".to_string(), page_segmentation: 6 }
    }
}

impl From<&OcrConfig> for OcrHint {
    fn from(config: &OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
            page_segmentation: config.page_segmentation,
        }
    }
}

/// Abstraction over an OCR backend.
/// Implementations accept PNG image bytes and return the recognized text as a
/// single newline-delimited blob; positional metadata is not part of the
/// contract.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_png: &[u8], hint: &OcrHint) -> Result<String, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string, for exercising the extraction pipeline
/// without requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_png: &[u8], _hint: &OcrHint) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract executable ──────────────────────────────────────────────────────

/// Pipes the image through the `tesseract` command-line tool.
///
/// The child is waited on synchronously and is not killed if the caller gives
/// up on the scan; it exits on its own once recognition finishes.
pub struct TesseractCli {
    program: PathBuf,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractCli {
    pub fn new() -> Self {
        Self { program: PathBuf::from("tesseract"), tessdata_dir: None }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_tessdata_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tessdata_dir = dir;
        self
    }

    fn command(&self, hint: &OcrHint) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&hint.language)
            .arg("--psm")
            .arg(hint.page_segmentation.to_string());
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractCli {
    fn recognize(&self, image_png: &[u8], hint: &OcrHint) -> Result<String, OcrError> {
        debug!(program = %self.program.display(), lang = %hint.language, "spawning tesseract");
        let mut child = self
            .command(hint)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::Engine(format!("failed to start {}: {e}", self.program.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image_png)
                .map_err(|e| OcrError::Engine(format!("failed to pipe image: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Engine(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!("tesseract exited with {}: {}", output.status, stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, OcrHint};
    use leptess::{LepTess, Variable};

    pub struct TesseractRecognizer {
        data_path: Option<String>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>) -> Self {
            Self { data_path }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_png: &[u8], hint: &OcrHint) -> Result<String, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &hint.language)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, &hint.page_segmentation.to_string())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_png)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}

#[cfg(not(feature = "tesseract"))]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, OcrHint};

    /// Stand-in used when the crate is built without libtesseract.
    pub struct TesseractRecognizer;

    impl TesseractRecognizer {
        pub fn new(_data_path: Option<String>) -> Self {
            Self
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, _image_png: &[u8], _hint: &OcrHint) -> Result<String, OcrError> {
            Err(OcrError::NotAvailable)
        }
    }
}
