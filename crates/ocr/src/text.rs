//! Raw OCR text → ordered, trimmed lines.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// A single trimmed, non-empty line of OCR output, in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Line(String);

impl Line {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Line {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split OCR text into lines, dropping anything shorter than `min_len`
/// characters or without a single letter or digit.
pub fn normalize_lines(raw: &str, min_len: usize) -> Vec<Line> {
    raw.lines()
        .map(str::trim)
        .filter(|l| l.chars().count() >= min_len)
        .filter(|l| l.chars().any(char::is_alphanumeric))
        .map(|l| Line(l.to_string()))
        .collect()
}

/// Share of characters that are neither alphanumeric nor whitespace.
pub fn symbol_ratio(line: &str) -> f32 {
    let total = line.chars().count();
    if total == 0 {
        return 0.0;
    }
    let symbols = line
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    symbols as f32 / total as f32
}

/// OCR garbage such as `~-=*#;:` streaks from paper texture.
pub fn is_noisy(line: &str, max_ratio: f32) -> bool {
    symbol_ratio(line) > max_ratio
}

/// "WALMART SUPERCENTER" → "Walmart Supercenter".
pub fn title_case(line: &str) -> String {
    line.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(Line::as_str).collect()
    }

    #[test]
    fn splits_trims_and_keeps_order() {
        let lines = normalize_lines("  NO FRILLS \n\n Milk 4.99\r\n\tEggs 3.49  ", 2);
        assert_eq!(strs(&lines), ["NO FRILLS", "Milk 4.99", "Eggs 3.49"]);
    }

    #[test]
    fn drops_short_and_symbol_only_fragments() {
        let lines = normalize_lines("a\n--\n****\nOK\n|", 2);
        assert_eq!(strs(&lines), ["OK"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(normalize_lines("", 2).is_empty());
        assert!(normalize_lines("\n \n", 2).is_empty());
    }

    #[test]
    fn noise_ratio() {
        assert!(is_noisy("~=-*# ;:", 0.3));
        assert!(!is_noisy("BANANAS 2.00", 0.3));
        assert_eq!(symbol_ratio(""), 0.0);
    }

    #[test]
    fn title_cases_words() {
        assert_eq!(title_case("WALMART  SUPERCENTER"), "Walmart Supercenter");
        assert_eq!(title_case("joe's deli"), "Joe's Deli");
    }
}
