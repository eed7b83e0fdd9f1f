use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tillscan_core::{Money, ProductItem, Receipt};

/// One purchasable row recovered from the receipt body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    /// Unit price; once a quantity or deal line has been reconciled this is
    /// the field of record, not the printed line total.
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(name: impl Into<String>, unit_price: Money, quantity: u32) -> Self {
        Self { name: name.into(), unit_price, quantity: quantity.max(1) }
    }

    /// The editable empty row substituted when nothing could be parsed.
    pub fn placeholder() -> Self {
        Self { name: String::new(), unit_price: Money::zero(), quantity: 1 }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty() && self.unit_price.is_zero()
    }
}

/// Structured result of one scan. `items` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedReceipt {
    pub store_name: String,
    /// ISO-8601 when the printed date could be normalized, otherwise as printed.
    pub date: String,
    pub total: Money,
    pub items: Vec<LineItem>,
    /// OCR output the fields were extracted from, kept for diagnostics.
    pub raw_text: String,
}

impl ParsedReceipt {
    /// Convert into the record shape the storage layer accepts.
    pub fn into_record(self, now: DateTime<Utc>) -> Receipt {
        let items = self
            .items
            .into_iter()
            .map(|item| ProductItem::new(item.name, item.unit_price, item.quantity))
            .collect();
        let raw_text = (!self.raw_text.is_empty()).then_some(self.raw_text);
        Receipt::new(self.store_name, self.date, self.total, items, raw_text, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_editable_row() {
        let p = LineItem::placeholder();
        assert!(p.is_placeholder());
        assert_eq!(p.quantity, 1);
        assert!(!LineItem::new("Milk", Money::from_cents(399), 1).is_placeholder());
    }

    #[test]
    fn into_record_carries_fields() {
        let parsed = ParsedReceipt {
            store_name: "No Frills".into(),
            date: "2024-03-15".into(),
            total: Money::from_cents(500),
            items: vec![LineItem::new("Cookies", Money::from_cents(250), 2)],
            raw_text: "NO FRILLS\nCookies 5.00".into(),
        };
        let record = parsed.into_record(Utc::now());
        assert_eq!(record.store_name, "No Frills");
        assert_eq!(record.items[0].quantity, 2);
        assert_eq!(record.total_of_items(), Money::from_cents(500));
        assert_eq!(record.raw_text.as_deref(), Some("NO FRILLS\nCookies 5.00"));
    }
}
