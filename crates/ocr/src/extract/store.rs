use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::{amount_tokens, contains_date};
use crate::config::ExtractionConfig;
use crate::stores::StoreDictionary;
use crate::text::{is_noisy, title_case};

/// Reported when no line of the header looks like a merchant name.
pub const UNKNOWN_STORE: &str = "Unknown Store";

re!(re_store_skip, concat!(
    r"(?i)^\d",
    r"|\b(?:tel|phone|ph|fax)\b",
    r"|https?://|\bwww\.|\.(?:com|ca|net)\b",
    r"|\bwelcome\b|\breceipt\b",
    r"|\b(?:gst|hst|pst|qst|vat|bn)\s*(?:#|no\b|reg|number|\d)",
    r"|\b(?:st|street|ave|avenue|rd|road|blvd|boulevard|dr|drive|hwy|highway|cres|suite|unit)\b\.?(?:\s|,|$)",
));

/// Where the merchant name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSource {
    Dictionary,
    /// Title-cased header line at this index.
    Header(usize),
    Unknown,
}

/// Merchant name from the receipt header.
///
/// The known-store dictionary is consulted first and its display name returned
/// on a hit. Failing that, the first early line that is neither noise, a
/// priced line, nor address/contact boilerplate is title-cased. With no
/// candidate the result is [`UNKNOWN_STORE`].
pub fn extract_store<L: AsRef<str>>(lines: &[L], stores: &StoreDictionary, config: &ExtractionConfig) -> String {
    locate_store(lines, stores, config).0
}

/// As [`extract_store`], also reporting which phase produced the name.
pub fn locate_store<L: AsRef<str>>(
    lines: &[L],
    stores: &StoreDictionary,
    config: &ExtractionConfig,
) -> (String, StoreSource) {
    if let Some(name) = lines
        .iter()
        .take(config.store_dictionary_lines)
        .find_map(|l| stores.lookup(l.as_ref()))
    {
        debug!(store = name, "store from dictionary");
        return (name.to_string(), StoreSource::Dictionary);
    }

    lines
        .iter()
        .take(config.store_heuristic_lines)
        .map(AsRef::<str>::as_ref)
        .position(|l| {
            !is_noisy(l, config.noise_ratio)
                && !re_store_skip().is_match(l)
                && !contains_date(l)
                && amount_tokens(l).is_empty()
                && l.chars().any(char::is_alphabetic)
        })
        .map(|idx| {
            let line = lines[idx].as_ref();
            debug!(line, "store from header heuristic");
            (title_case(line), StoreSource::Header(idx))
        })
        .unwrap_or_else(|| (UNKNOWN_STORE.to_string(), StoreSource::Unknown))
}
