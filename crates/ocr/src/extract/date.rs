use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use tracing::debug;

re!(re_date_ymd,
    r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b");
re!(re_date_dmy,
    r"\b(\d{1,2})[-/](\d{1,2})[-/](\d{2}|\d{4})\b");
re!(re_date_month_name,
    r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b");
re!(re_date_day_month,
    r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(\d{4})\b");

type DateParser = fn(&Captures<'_>) -> Option<NaiveDate>;

/// Patterns tried on each line, most specific first.
const DATE_PATTERNS: [(fn() -> &'static Regex, DateParser); 4] = [
    (re_date_ymd, parse_ymd),
    (re_date_dmy, parse_dmy),
    (re_date_month_name, parse_month_name),
    (re_date_day_month, parse_day_month),
];

/// First date printed anywhere on the receipt, as ISO-8601.
///
/// A match that is not a real calendar date is returned as printed. With no
/// match at all the result is `today`.
pub fn extract_date<L: AsRef<str>>(lines: &[L], today: NaiveDate) -> String {
    for line in lines {
        let line = line.as_ref();
        for (pattern, parse) in DATE_PATTERNS {
            if let Some(c) = pattern().captures(line) {
                return match parse(&c) {
                    Some(date) => date.format("%Y-%m-%d").to_string(),
                    None => {
                        debug!(raw = &c[0], "date did not normalize, keeping it as printed");
                        c[0].to_string()
                    }
                };
            }
        }
    }
    debug!("no date on receipt, defaulting to {today}");
    today.format("%Y-%m-%d").to_string()
}

/// Whether any date pattern occurs on the line.
pub fn contains_date(line: &str) -> bool {
    DATE_PATTERNS.iter().any(|(pattern, _)| pattern().is_match(line))
}

fn num<T: std::str::FromStr>(c: &Captures<'_>, i: usize) -> Option<T> {
    c.get(i)?.as_str().parse().ok()
}

fn parse_ymd(c: &Captures<'_>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(num(c, 1)?, num(c, 2)?, num(c, 3)?)
}

/// Day first unless that is impossible and month-first is not.
fn parse_dmy(c: &Captures<'_>) -> Option<NaiveDate> {
    let first: u32 = num(c, 1)?;
    let second: u32 = num(c, 2)?;
    let year = expand_year(num(c, 3)?);
    let (day, month) = if second > 12 && first <= 12 { (second, first) } else { (first, second) };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_month_name(c: &Captures<'_>) -> Option<NaiveDate> {
    let month = abbr_month_to_num(c.get(1)?.as_str())?;
    NaiveDate::from_ymd_opt(num(c, 3)?, month, num(c, 2)?)
}

fn parse_day_month(c: &Captures<'_>) -> Option<NaiveDate> {
    let month = abbr_month_to_num(c.get(2)?.as_str())?;
    NaiveDate::from_ymd_opt(num(c, 3)?, month, num(c, 1)?)
}

fn expand_year(y: i32) -> i32 {
    if y < 100 { 2000 + y } else { y }
}

fn abbr_month_to_num(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "jan" => Some(1), "feb" => Some(2), "mar" => Some(3), "apr" => Some(4),
        "may" => Some(5), "jun" => Some(6), "jul" => Some(7), "aug" => Some(8),
        "sep" => Some(9), "oct" => Some(10), "nov" => Some(11), "dec" => Some(12),
        _ => None,
    }
}
