use std::sync::OnceLock;

use regex::Regex;
use tillscan_core::Money;
use tracing::debug;

use super::amount_tokens;

re!(re_total_strong,
    r"(?i)\b(?:grand\s+total|total|balance\s+due|amount\s+due|final)\b");
re!(re_total_avoid,
    r"(?i)\b(?:sub\s*-?\s*total|tax|hst|gst|pst|qst|change|cash|visa|debit)\b");

/// Receipt grand total.
///
/// Lines are read bottom-up. The first line carrying a strong total keyword and
/// none of the avoid keywords wins; when that line shows no amount, a bare
/// amount on the line just below it is used. Otherwise the largest amount seen
/// anywhere is returned, and zero when the receipt has no amounts at all.
pub fn extract_total<L: AsRef<str>>(lines: &[L]) -> Money {
    let mut largest: Option<Money> = None;
    let mut amount_below: Option<Money> = None;

    for line in lines.iter().rev() {
        let line = line.as_ref();
        let amounts = amount_tokens(line);
        let last = amounts.last().copied().filter(|m| !m.is_negative());

        if re_total_strong().is_match(line) && !re_total_avoid().is_match(line) {
            if let Some(total) = last.or(amount_below) {
                debug!(line, %total, "total from keyword line");
                return total;
            }
        }

        amount_below = if is_bare_amount(line) { last } else { None };
        largest = amounts
            .into_iter()
            .filter(|m| !m.is_negative())
            .chain(largest)
            .max();
    }

    debug!("no keyword total, using largest amount");
    largest.unwrap_or_else(Money::zero)
}

fn is_bare_amount(line: &str) -> bool {
    !line.chars().any(char::is_alphabetic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_keyword_beats_larger_subtotal_value() {
        let lines = ["Subtotal 39.00", "Tax 3.17", "Total 42.17", "Cash 50.00", "Change 7.83"];
        assert_eq!(extract_total(&lines), Money::from_cents(4217));
    }

    #[test]
    fn total_keyword_ignores_earlier_subtotal() {
        let lines = ["Subtotal ... 39.00", "Total ... 42.17"];
        assert_eq!(extract_total(&lines), Money::from_cents(4217));
    }

    #[test]
    fn balance_due_and_grand_total() {
        assert_eq!(extract_total(&["ITEM 5.00", "BALANCE DUE $12.50"]), Money::from_cents(1250));
        assert_eq!(extract_total(&["GRAND TOTAL: 1,234.56"]), Money::from_cents(123456));
    }

    #[test]
    fn amount_on_line_below_keyword() {
        assert_eq!(extract_total(&["Bread 2.49", "TOTAL", "$8.75"]), Money::from_cents(875));
    }

    #[test]
    fn falls_back_to_largest_amount() {
        assert_eq!(extract_total(&["STORE", "$5.00", "$3.00", "$8.00"]), Money::from_cents(800));
        assert_eq!(extract_total(&["Subtotal 10.00", "HST 1.30"]), Money::from_cents(1000));
    }

    #[test]
    fn zero_without_amounts() {
        assert_eq!(extract_total(&["WALMART", "Thank you"]), Money::zero());
        assert_eq!(extract_total::<&str>(&[]), Money::zero());
    }

    #[test]
    fn credits_are_not_totals() {
        assert_eq!(extract_total(&["COUPON -15.00", "MILK 4.99"]), Money::from_cents(499));
    }
}
