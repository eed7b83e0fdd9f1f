//! Heuristic field extraction from OCR text.
//!
//! Every extractor is best-effort and has a defined fallback, so once OCR has
//! produced text the caller always gets a complete [`ParsedReceipt`].

use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use chrono::{Local, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use tillscan_core::Money;
use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::stores::StoreDictionary;
use crate::text::{normalize_lines, Line};
use crate::types::{LineItem, ParsedReceipt};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

mod date;
mod items;
mod store;
mod total;

pub use date::{contains_date, extract_date};
pub use items::{classify, ItemLineParser, LineBuffer, LineClass, LineKind, QuantityHint, CLASSIFICATION_ORDER};
pub use store::{extract_store, locate_store, StoreSource, UNKNOWN_STORE};
pub use total::extract_total;

// A whitespace-delimited amount: optional sign and `$`, two decimals, and an
// optional tax-code suffix ("4.99HC", "$1,234.56", "1.99-").
re!(re_amount_token,
    r"^(-)?\$?(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})(-)?(?:[A-Za-z]{1,2}|\*)?$");

/// Parse a printed amount ("1,234.56", "$5.00") into money.
pub fn parse_amount(s: &str) -> Option<Money> {
    let clean: String = s.chars().filter(|c| !matches!(c, ',' | '$' | ' ')).collect();
    Decimal::from_str(&clean).ok().map(Money::from_decimal)
}

/// Amount tokens on a line, left to right; credits (leading or trailing `-`)
/// come back negative.
pub fn amount_tokens(line: &str) -> Vec<Money> {
    line.split(|c: char| c.is_whitespace() || c == ':' || c == '=')
        .filter_map(|token| {
            let c = re_amount_token().captures(token)?;
            let value = parse_amount(c.get(2)?.as_str())?;
            let negative = c.get(1).is_some() || c.get(3).is_some();
            Some(if negative { Money::zero() - value } else { value })
        })
        .collect()
}

/// Assemble the receipt, substituting one editable placeholder row when no
/// item could be recovered.
pub fn assemble(
    store_name: String,
    date: String,
    total: Money,
    mut items: Vec<LineItem>,
    raw_text: &str,
) -> ParsedReceipt {
    if items.is_empty() {
        debug!("no items recovered, substituting placeholder row");
        items.push(LineItem::placeholder());
    }
    ParsedReceipt { store_name, date, total, items, raw_text: raw_text.to_string() }
}

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor {
    config: ExtractionConfig,
    stores: Arc<StoreDictionary>,
    items: ItemLineParser,
}

impl Extractor {
    /// Build from configuration, merging a user store file over the built-in
    /// dictionary when one is configured. An unreadable store file is logged
    /// and the built-in dictionary used alone.
    pub fn new(config: ExtractionConfig) -> Self {
        let builtin = StoreDictionary::builtin();
        let stores = match &config.stores_file {
            Some(path) => match StoreDictionary::from_file(path) {
                Ok(extra) => Arc::new(builtin.merged_with(&extra)),
                Err(e) => {
                    warn!("ignoring store dictionary {}: {e}", path.display());
                    builtin
                }
            },
            None => builtin,
        };
        Self::with_dictionary(config, stores)
    }

    pub fn with_dictionary(config: ExtractionConfig, stores: Arc<StoreDictionary>) -> Self {
        let items = ItemLineParser::new(&config, Arc::clone(&stores));
        Self { config, stores, items }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract structured fields from raw OCR text, defaulting the date to today.
    pub fn extract(&self, ocr_text: &str) -> ParsedReceipt {
        self.extract_on(ocr_text, Local::now().date_naive())
    }

    /// As [`Extractor::extract`] with an explicit fallback date, which makes the
    /// result a pure function of its inputs.
    pub fn extract_on(&self, ocr_text: &str, today: NaiveDate) -> ParsedReceipt {
        let lines = normalize_lines(ocr_text, self.config.min_line_len);
        self.extract_lines(&lines, ocr_text, today)
    }

    pub fn extract_lines(&self, lines: &[Line], raw_text: &str, today: NaiveDate) -> ParsedReceipt {
        let (store_name, source) = locate_store(lines, &self.stores, &self.config);
        let header = match source {
            StoreSource::Header(idx) => Some(idx),
            StoreSource::Dictionary | StoreSource::Unknown => None,
        };
        let date = extract_date(lines, today);
        let total = extract_total(lines);
        let items = self.items.parse_with_header(lines, header);
        debug!(store = %store_name, %date, %total, items = items.len(), "fields extracted");
        assemble(store_name, date, total, items, raw_text)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
