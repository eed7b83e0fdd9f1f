use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Generate a fresh record id (random UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One purchasable row of a stored receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItem {
    pub id: String,
    pub name: String,
    /// Unit price.
    pub price: Money,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ProductItem {
    pub fn new(name: impl Into<String>, price: Money, quantity: u32) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            price,
            quantity: quantity.max(1),
            category: None,
        }
    }

    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

/// The record handed to the storage collaborator once a scan is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub store_name: String,
    /// ISO-8601 date when it could be normalized, otherwise the text as printed.
    pub date: String,
    pub total_amount: Money,
    pub items: Vec<ProductItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl Receipt {
    pub fn new(
        store_name: impl Into<String>,
        date: impl Into<String>,
        total_amount: Money,
        items: Vec<ProductItem>,
        raw_text: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            created_at: created_at.timestamp_millis(),
            store_name: store_name.into(),
            date: date.into(),
            total_amount,
            items,
            raw_text,
        }
    }

    /// Sum of `price × quantity` over all items.
    pub fn total_of_items(&self) -> Money {
        self.items
            .iter()
            .map(ProductItem::line_total)
            .fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Receipt {
        Receipt::new(
            "Walmart",
            "2024-03-15",
            Money::from_cents(700),
            vec![
                ProductItem::new("Cookies", Money::from_cents(250), 2),
                ProductItem::new("Milk", Money::from_cents(200), 1),
            ],
            None,
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(new_id(), new_id());
        let r = sample();
        assert_ne!(r.items[0].id, r.items[1].id);
    }

    #[test]
    fn quantity_is_at_least_one() {
        assert_eq!(ProductItem::new("Milk", Money::zero(), 0).quantity, 1);
    }

    #[test]
    fn total_of_items_multiplies_quantity() {
        assert_eq!(sample().total_of_items(), Money::from_cents(700));
    }

    #[test]
    fn serializes_camel_case_for_storage() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["storeName"], "Walmart");
        assert_eq!(json["createdAt"], 1_710_504_000_000i64);
        assert!(json["totalAmount"].is_number());
        assert_eq!(json["totalAmount"], 7.0);
        assert_eq!(json["items"][0]["price"], 2.5);
        assert_eq!(json["items"][0]["quantity"], 2);
        assert!(json.get("rawText").is_none());
        assert!(json["items"][0].get("category").is_none());
    }

    #[test]
    fn storage_json_reads_back() {
        let r = sample();
        let back: Receipt = serde_json::from_str(&serde_json::to_string(&r).unwrap()).unwrap();
        assert_eq!(back, r);
    }
}
