//! Tunables for the scan pipeline, loadable from a TOML file.
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub preprocess: PreprocessConfig,
    pub ocr: OcrConfig,
    pub extraction: ExtractionConfig,
}

impl ScanConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.preprocess;
        if p.max_scale.is_nan() || p.max_scale <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "preprocess.max_scale",
                reason: format!("must be positive, got {}", p.max_scale),
            });
        }
        if p.target_max_dimension == 0 {
            return Err(ConfigError::Invalid {
                field: "preprocess.target_max_dimension",
                reason: "must be positive".into(),
            });
        }
        if self.ocr.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "ocr.timeout_secs",
                reason: "must be at least one second".into(),
            });
        }
        let e = &self.extraction;
        if e.line_buffer_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "extraction.line_buffer_capacity",
                reason: "must hold at least one line".into(),
            });
        }
        if !(0.0..=1.0).contains(&e.noise_ratio) {
            return Err(ConfigError::Invalid {
                field: "extraction.noise_ratio",
                reason: format!("must be within 0.0..=1.0, got {}", e.noise_ratio),
            });
        }
        Ok(())
    }
}

/// Image normalization ahead of OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Upper bound on the resample factor, even for tiny images.
    pub max_scale: f32,
    /// Longest edge the resampled image should reach.
    pub target_max_dimension: u32,
    /// Luminance above this is white, everything else black.
    pub threshold: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { max_scale: 2.5, target_max_dimension: 2500, threshold: 140 }
    }
}

/// Hints passed to the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub language: String,
    /// Tesseract page segmentation mode (6 = single uniform block of text).
    pub page_segmentation: u8,
    pub timeout_secs: u64,
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            page_segmentation: 6,
            timeout_secs: 60,
            tessdata_dir: None,
        }
    }
}

/// What the item parser does when it meets a footer keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FooterPolicy {
    /// Stop scanning for items entirely.
    #[default]
    Break,
    /// Drop only the footer line and keep scanning.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Lines shorter than this (in characters) are OCR noise.
    pub min_line_len: usize,
    pub line_buffer_capacity: usize,
    /// How many leading lines the dictionary phase of store detection reads.
    pub store_dictionary_lines: usize,
    /// How many leading lines the positional fallback reads.
    pub store_heuristic_lines: usize,
    /// A line is noisy when more than this share of its characters are symbols.
    pub noise_ratio: f32,
    /// Prices at or above this are treated as misread SKUs or phone fragments.
    pub max_item_price: u32,
    pub footer_policy: FooterPolicy,
    /// Extra known-store entries merged over the built-in dictionary.
    pub stores_file: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_line_len: 2,
            line_buffer_capacity: 3,
            store_dictionary_lines: 15,
            store_heuristic_lines: 8,
            noise_ratio: 0.30,
            max_item_price: 900,
            footer_policy: FooterPolicy::Break,
            stores_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = ScanConfig::from_toml_str(
            r#"
            [extraction]
            footer_policy = "skip"

            [preprocess]
            threshold = 145
            "#,
        )
        .unwrap();
        assert_eq!(cfg.extraction.footer_policy, FooterPolicy::Skip);
        assert_eq!(cfg.extraction.line_buffer_capacity, 3);
        assert_eq!(cfg.preprocess.threshold, 145);
        assert_eq!(cfg.preprocess.max_scale, 2.5);
        assert_eq!(cfg.ocr.language, "eng");
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(ScanConfig::from_toml_str("").unwrap(), ScanConfig::default());
    }

    #[test]
    fn rejects_zero_buffer() {
        let err = ScanConfig::from_toml_str("[extraction]\nline_buffer_capacity = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "extraction.line_buffer_capacity", .. }));
    }

    #[test]
    fn rejects_unknown_footer_policy() {
        let err = ScanConfig::from_toml_str("[extraction]\nfooter_policy = \"maybe\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_roundtrip_of_defaults() {
        let text = ScanConfig::default().to_toml_string().unwrap();
        assert_eq!(ScanConfig::from_toml_str(&text).unwrap(), ScanConfig::default());
    }

    #[test]
    fn from_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScanConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
