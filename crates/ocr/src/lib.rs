pub mod config;
pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod stores;
pub mod text;
pub mod types;

pub use config::{ConfigError, ExtractionConfig, FooterPolicy, OcrConfig, PreprocessConfig, ScanConfig};
pub use extract::{Extractor, UNKNOWN_STORE};
pub use pipeline::{PipelineError, ReceiptPipeline};
pub use preprocess::{prepare_for_ocr, prepare_for_ocr_from_bytes, PreprocessError, PreprocessedImage};
pub use recognizer::tesseract_backend::TesseractRecognizer;
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, OcrHint, TesseractCli};
pub use stores::StoreDictionary;
pub use text::{normalize_lines, Line};
pub use types::{LineItem, ParsedReceipt};
