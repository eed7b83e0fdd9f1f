//! Known-merchant dictionary used to recognize the store from the receipt header.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

const BUILTIN_STORES: &str = include_str!("../data/stores.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    /// Display form reported to the user.
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StoreFile {
    #[serde(default)]
    version: u32,
    #[serde(default, rename = "store")]
    stores: Vec<StoreEntry>,
}

/// Immutable table of merchant names keyed by their normalized spelling.
#[derive(Debug, Clone)]
pub struct StoreDictionary {
    version: u32,
    entries: Vec<StoreEntry>,
    /// (normalized key, index into `entries`), longest key first.
    keys: Vec<(String, usize)>,
}

/// Uppercase and drop everything that is not a letter.
pub fn normalize_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_uppercase)
        .collect()
}

impl StoreDictionary {
    pub fn new(version: u32, entries: Vec<StoreEntry>) -> Self {
        let mut keys: Vec<(String, usize)> = entries
            .iter()
            .enumerate()
            .flat_map(|(idx, entry)| {
                std::iter::once(&entry.name)
                    .chain(entry.aliases.iter())
                    .map(move |spelling| (normalize_key(spelling), idx))
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        keys.sort_by(|a, b| {
            b.0.len()
                .cmp(&a.0.len())
                .then_with(|| a.0.cmp(&b.0))
                .then_with(|| a.1.cmp(&b.1))
        });
        keys.dedup_by(|a, b| a.0 == b.0);
        Self { version, entries, keys }
    }

    /// The dictionary shipped with the crate, parsed once per process.
    pub fn builtin() -> Arc<StoreDictionary> {
        static BUILTIN: OnceLock<Arc<StoreDictionary>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                Arc::new(StoreDictionary::from_toml(BUILTIN_STORES).expect("invalid built-in store dictionary"))
            })
            .clone()
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: StoreFile = toml::from_str(content)?;
        Ok(Self::new(file.version, file.stores))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// A new dictionary holding this one's entries followed by `extra`'s.
    /// When both spell a key the same way, the earlier entry wins.
    pub fn merged_with(&self, extra: &StoreDictionary) -> StoreDictionary {
        let mut entries = self.entries.clone();
        entries.extend(extra.entries.iter().cloned());
        StoreDictionary::new(self.version.max(extra.version), entries)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display name of the merchant mentioned in `line`, if any.
    ///
    /// A key matches a run of whole words, so "IGA" does not fire inside
    /// "GIGANTIC" and "FRESHCO" does not fire on "FRESH CORN".
    pub fn lookup(&self, line: &str) -> Option<&str> {
        let mut joined = String::new();
        let mut bounds = vec![0];
        for word in line.split_whitespace().map(normalize_key).filter(|w| !w.is_empty()) {
            joined.push_str(&word);
            bounds.push(joined.len());
        }
        if joined.is_empty() {
            return None;
        }
        self.keys
            .iter()
            .find(|(key, _)| {
                bounds
                    .iter()
                    .any(|&start| joined[start..].starts_with(key.as_str()) && bounds.contains(&(start + key.len())))
            })
            .map(|(_, idx)| self.entries[*idx].name.as_str())
    }
}
