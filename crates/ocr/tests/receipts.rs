//! End-to-end runs over realistic OCR output.

use std::io::Cursor;

use chrono::NaiveDate;
use image::{DynamicImage, ImageBuffer, Rgb};
use pretty_assertions::assert_eq;
use tillscan_core::Money;
use tillscan_ocr::{Extractor, LineItem, MockRecognizer, ParsedReceipt, ReceiptPipeline, ScanConfig};

const NO_FRILLS: &str = "\
NO FRILLS
Store #3112  Tel (416) 555-0199
2024-03-15 18:04
~~~~~ ::: ~~~~~
BANANAS
1.12
2 @ 1.99
COOKIES 3.98
Organic
Baby Spinach 4.49 HC
GRANOLA BAR 4.00
2/3.00
SUBTOTAL 13.59
HST 0.58
TOTAL 14.17
DEBIT 14.17
ITEMS SOLD 6
Thank you for shopping!
";

const MESSY: &str = "\
#$*&^ ~ |
lll||| .
WELCOME TO
BLUE DOOR MARKET
15/04/2024
TOMATOES 3.29
1234567 999.99
42 2.00
BALANCE DUE 3.29
";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn assert_invariants(r: &ParsedReceipt) {
    assert!(!r.items.is_empty());
    let ceiling = Money::from_cents(90_000);
    for item in &r.items {
        assert!(item.quantity >= 1, "{item:?}");
        assert!(!item.unit_price.is_negative() && item.unit_price < ceiling, "{item:?}");
    }
    assert!(!r.total.is_negative());
}

fn photo_png() -> Vec<u8> {
    let img = ImageBuffer::from_fn(40, 60, |x, y| {
        if (x + y) % 7 == 0 { Rgb([20u8, 20, 20]) } else { Rgb([235u8, 230, 220]) }
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn grocery_receipt() {
    let r = Extractor::default().extract_on(NO_FRILLS, today());
    assert_invariants(&r);
    assert_eq!(r.store_name, "No Frills");
    assert_eq!(r.date, "2024-03-15");
    assert_eq!(r.total, Money::from_cents(1417));
    assert_eq!(
        r.items,
        vec![
            LineItem::new("BANANAS", Money::from_cents(112), 1),
            LineItem::new("COOKIES", Money::from_cents(199), 2),
            LineItem::new("Organic Baby Spinach", Money::from_cents(449), 1),
            LineItem::new("GRANOLA BAR", Money::from_cents(150), 2),
        ]
    );
}

#[test]
fn messy_receipt_keeps_only_plausible_items() {
    let r = Extractor::default().extract_on(MESSY, today());
    assert_invariants(&r);
    assert_eq!(r.store_name, "Blue Door Market");
    assert_eq!(r.date, "2024-04-15");
    assert_eq!(r.total, Money::from_cents(329));
    assert_eq!(r.items, vec![LineItem::new("TOMATOES", Money::from_cents(329), 1)]);
}

#[test]
fn misread_deal_does_not_break_price_ceiling() {
    let r = Extractor::default().extract_on("Cookies 5.00\n1/950.00\nTOTAL 5.00", today());
    assert_invariants(&r);
    assert_eq!(r.items, vec![LineItem::new("Cookies", Money::from_cents(500), 1)]);
}

#[test]
fn produce_names_are_not_store_names() {
    let r = Extractor::default().extract_on("BLUE DOOR MARKET\nFRESH CORN\n3.99\nTOTAL 3.99", today());
    assert_invariants(&r);
    assert_eq!(r.store_name, "Blue Door Market");
    assert_eq!(r.items, vec![LineItem::new("FRESH CORN", Money::from_cents(399), 1)]);
}

#[test]
fn nothing_recognizable_still_yields_a_receipt() {
    let r = Extractor::default().extract_on("|||\n~~\n", today());
    assert_invariants(&r);
    assert_eq!(r.store_name, "Unknown Store");
    assert_eq!(r.date, "2026-10-19");
    assert_eq!(r.total, Money::zero());
    assert_eq!(r.items, vec![LineItem::placeholder()]);
}

#[test]
fn repeated_runs_agree() {
    let ex = Extractor::default();
    assert_eq!(ex.extract_on(NO_FRILLS, today()), ex.extract_on(NO_FRILLS, today()));
}

#[tokio::test]
async fn image_to_receipt_through_the_pipeline() {
    let pipeline = ReceiptPipeline::new(MockRecognizer::new(NO_FRILLS), ScanConfig::default());
    let r = pipeline.process_bytes(&photo_png()).await.unwrap();
    assert_invariants(&r);
    assert_eq!(r.store_name, "No Frills");
    assert_eq!(r.items.len(), 4);
    assert_eq!(r.raw_text, NO_FRILLS);

    let record = r.into_record(chrono::Utc::now());
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["storeName"], "No Frills");
    assert_eq!(json["items"].as_array().map(Vec::len), Some(4));
}
