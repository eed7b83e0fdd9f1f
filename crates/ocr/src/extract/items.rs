//! Line items from the receipt body.
//!
//! Each line is classified once against [`CLASSIFICATION_ORDER`] and the
//! result folded left to right into the item list. The only state carried
//! between lines is a small [`LineBuffer`] of unattributed text, which
//! supplies multi-line names and `N @ price` quantity context.

use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use tillscan_core::Money;
use tracing::debug;

use super::{amount_tokens, contains_date, parse_amount};
use crate::config::{ExtractionConfig, FooterPolicy};
use crate::stores::StoreDictionary;
use crate::text::is_noisy;
use crate::types::LineItem;

re!(re_footer, concat!(
    r"(?i)\b(?:sub\s*-?\s*total|total|tax(?:able)?|hst|gst|pst|qst|balance",
    r"|visa|debit|master\s*card|auth(?:orization)?|change|due|cash|savings",
    r"|discount|items?\s+sold|account)\b",
));
re!(re_deal,
    r"(?i)^\s*(\d{1,2})\s*(?:/|for|@\s*for)\s*\$?\s*(\d+\.\d{2})\s*[a-z]{0,2}\s*$");
re!(re_header, concat!(
    r"(?i)\b(?:date|time|cashier|register|reg\s*#|store\s*#|trans(?:action)?|terminal",
    r"|tel|phone|fax|welcome|thank\s*you|receipt|invoice|order\s*#|operator)\b",
));
re!(re_contact,
    r"(?i)https?://|\bwww\.|\.(?:com|ca|net|org)\b|\(?\b\d{3}\)?[\s.-]\d{3}[\s.-]\d{4}\b");
re!(re_address,
    r"(?i)^\d+\s+.*\b(?:st|street|ave|avenue|rd|road|blvd|boulevard|dr|drive|hwy|highway|cres|way|lane|ln)\b");
re!(re_item,
    r"(?i)^(.*?\S)\s+(-)?\$?\s?(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})(-)?\s?(?:[a-z]{1,2}|\*)?$");
re!(re_standalone, concat!(
    r"(?i)^(?:(\d{1,3})\s*[@x]\s*\$?(\d+\.\d{2})\s+)?",
    r"\$?(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})\s?(?:[a-z]{1,2}|\*)?$",
));
re!(re_quantity,
    r"(?i)^\s*(\d{1,3})\s*[@x]\s*\$?\s*(\d+\.\d{2})");
re!(re_sku_prefix, r"^[\d\s\-]{3,}");
re!(re_leading_symbols, r"^[^\p{L}\p{N}]+");

/// Classification outcome without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Footer,
    Deal,
    Boilerplate,
    Item,
    StandalonePrice,
    FreeText,
}

/// "N @ unit" printed next to or above an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityHint {
    pub quantity: u32,
    pub unit_price: Money,
}

impl QuantityHint {
    /// Quantity context at the start of a line, if any.
    pub fn parse(line: &str) -> Option<Self> {
        hint_from(&re_quantity().captures(line)?)
    }
}

fn hint_from(c: &Captures<'_>) -> Option<QuantityHint> {
    let quantity: u32 = c.get(1)?.as_str().parse().ok()?;
    let unit_price = parse_amount(c.get(2)?.as_str())?;
    (quantity >= 1).then_some(QuantityHint { quantity, unit_price })
}

/// One line, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Footer,
    /// "2/5.00": the previous item was sold `quantity` for `deal_total`.
    Deal { quantity: u32, deal_total: Money },
    Boilerplate,
    /// Raw name (not yet cleaned) and the signed trailing price.
    Item { name: String, price: Money },
    StandalonePrice { price: Money, quantity: Option<QuantityHint> },
    FreeText(String),
}

impl LineClass {
    pub fn kind(&self) -> LineKind {
        match self {
            LineClass::Footer => LineKind::Footer,
            LineClass::Deal { .. } => LineKind::Deal,
            LineClass::Boilerplate => LineKind::Boilerplate,
            LineClass::Item { .. } => LineKind::Item,
            LineClass::StandalonePrice { .. } => LineKind::StandalonePrice,
            LineClass::FreeText(_) => LineKind::FreeText,
        }
    }
}

pub type Rule = fn(&str, &StoreDictionary) -> Option<LineClass>;

/// Rules tried top-down; the first that fires decides the line. Anything
/// left over is [`LineClass::FreeText`].
pub const CLASSIFICATION_ORDER: [(LineKind, Rule); 5] = [
    (LineKind::Footer, footer_rule),
    (LineKind::Deal, deal_rule),
    (LineKind::Boilerplate, boilerplate_rule),
    (LineKind::Item, item_rule),
    (LineKind::StandalonePrice, standalone_rule),
];

pub fn classify(line: &str, stores: &StoreDictionary) -> LineClass {
    CLASSIFICATION_ORDER
        .iter()
        .find_map(|(_, rule)| rule(line, stores))
        .unwrap_or_else(|| LineClass::FreeText(line.to_string()))
}

fn footer_rule(line: &str, _: &StoreDictionary) -> Option<LineClass> {
    re_footer().is_match(line).then_some(LineClass::Footer)
}

fn deal_rule(line: &str, _: &StoreDictionary) -> Option<LineClass> {
    let c = re_deal().captures(line)?;
    let quantity: u32 = c.get(1)?.as_str().parse().ok()?;
    let deal_total = parse_amount(c.get(2)?.as_str())?;
    (quantity >= 1).then_some(LineClass::Deal { quantity, deal_total })
}

fn boilerplate_rule(line: &str, stores: &StoreDictionary) -> Option<LineClass> {
    let boilerplate = re_header().is_match(line)
        || re_contact().is_match(line)
        || contains_date(line)
        || (amount_tokens(line).is_empty()
            && (re_address().is_match(line) || stores.lookup(line).is_some()));
    boilerplate.then_some(LineClass::Boilerplate)
}

fn item_rule(line: &str, _: &StoreDictionary) -> Option<LineClass> {
    if QuantityHint::parse(line).is_some() {
        return None;
    }
    let c = re_item().captures(line)?;
    let name = c.get(1)?.as_str();
    let value = parse_amount(c.get(3)?.as_str())?;
    let negative = c.get(2).is_some() || c.get(4).is_some();
    let price = if negative { Money::zero() - value } else { value };
    Some(LineClass::Item { name: name.to_string(), price })
}

fn standalone_rule(line: &str, _: &StoreDictionary) -> Option<LineClass> {
    let c = re_standalone().captures(line)?;
    let price = parse_amount(c.get(3)?.as_str())?;
    let quantity = if c.get(1).is_some() { Some(hint_from(&c)?) } else { None };
    Some(LineClass::StandalonePrice { price, quantity })
}

/// Strip SKU digits and OCR debris from the front of a name.
fn clean_name(raw: &str) -> String {
    let name = re_sku_prefix().replace(raw.trim(), "");
    let name = re_leading_symbols().replace(&name, "");
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn valid_name(name: &str) -> bool {
    name.chars().count() >= 2 && name.chars().any(char::is_alphabetic)
}

// ── Lookback buffer ──────────────────────────────────────────────────────────

/// Bounded FIFO of lines not yet attributed to an item.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { lines: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append, evicting the oldest line when full.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn latest(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ── Parser ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct ScanState {
    items: Vec<LineItem>,
    buffer: LineBuffer,
}

#[derive(Debug, Clone)]
pub struct ItemLineParser {
    buffer_capacity: usize,
    noise_ratio: f32,
    max_price: Money,
    footer_policy: FooterPolicy,
    stores: Arc<StoreDictionary>,
}

impl ItemLineParser {
    pub fn new(config: &ExtractionConfig, stores: Arc<StoreDictionary>) -> Self {
        Self {
            buffer_capacity: config.line_buffer_capacity,
            noise_ratio: config.noise_ratio,
            max_price: Money::from_cents(i64::from(config.max_item_price) * 100),
            footer_policy: config.footer_policy,
            stores,
        }
    }

    /// Items in reading order. Stops at the first footer line unless the
    /// footer policy says to skip footers instead.
    pub fn parse<L: AsRef<str>>(&self, lines: &[L]) -> Vec<LineItem> {
        self.parse_with_header(lines, None)
    }

    /// As [`ItemLineParser::parse`], with the merchant header at index
    /// `header` handled as boilerplate.
    pub fn parse_with_header<L: AsRef<str>>(&self, lines: &[L], header: Option<usize>) -> Vec<LineItem> {
        let start = ScanState { items: Vec::new(), buffer: LineBuffer::new(self.buffer_capacity) };
        let flow = lines.iter().enumerate().try_fold(start, |state, (idx, line)| {
            let line = line.as_ref();
            let class = if header == Some(idx) { LineClass::Boilerplate } else { classify(line, &self.stores) };
            self.step(state, line, class)
        });
        match flow {
            ControlFlow::Continue(state) | ControlFlow::Break(state) => state.items,
        }
    }

    fn step(&self, mut state: ScanState, line: &str, class: LineClass) -> ControlFlow<ScanState, ScanState> {
        debug!(line, kind = ?class.kind(), "classified");

        match class {
            LineClass::Footer => match self.footer_policy {
                FooterPolicy::Break => return ControlFlow::Break(state),
                FooterPolicy::Skip => state.buffer.clear(),
            },
            LineClass::Deal { quantity, deal_total } => {
                let unit_price = deal_total.split(quantity);
                match state.items.last_mut() {
                    Some(item) if self.plausible_price(unit_price) => {
                        item.unit_price = unit_price;
                        item.quantity = quantity;
                    }
                    Some(_) => debug!(line, %unit_price, "deal price out of range, ignored"),
                    None => debug!(line, "deal line before any item, ignored"),
                }
            }
            LineClass::Boilerplate => state.buffer.clear(),
            LineClass::Item { name, price } => {
                let item = self.priced_item(&name, price, &state.buffer);
                state.items.extend(item);
                state.buffer.clear();
            }
            LineClass::StandalonePrice { price, quantity } => {
                let name = self.buffered_name(&state.buffer);
                if name.is_empty() && quantity.is_some() {
                    state.buffer.push(line);
                } else {
                    let item = self.standalone_item(name, price, quantity, &state.buffer);
                    state.items.extend(item);
                    state.buffer.clear();
                }
            }
            LineClass::FreeText(text) => state.buffer.push(text),
        }
        ControlFlow::Continue(state)
    }

    /// An item line, reconciled with the most recent buffered line: a
    /// quantity line there sets quantity and unit price, plain text is a name
    /// continuation.
    fn priced_item(&self, raw_name: &str, price: Money, buffer: &LineBuffer) -> Option<LineItem> {
        let mut name = clean_name(raw_name);
        let mut unit_price = price;
        let mut quantity = 1;

        if let Some(latest) = buffer.latest() {
            match QuantityHint::parse(latest) {
                Some(hint) => {
                    quantity = hint.quantity;
                    unit_price = hint.unit_price;
                }
                None if self.is_name_fragment(latest) => {
                    name = clean_name(&format!("{latest} {name}"));
                }
                None => {}
            }
        }
        self.accept(name, unit_price, quantity)
    }

    fn standalone_item(
        &self,
        name: String,
        price: Money,
        inline: Option<QuantityHint>,
        buffer: &LineBuffer,
    ) -> Option<LineItem> {
        let buffered = buffer.iter().filter_map(QuantityHint::parse).last();
        match buffered.or(inline) {
            Some(hint) => self.accept(name, hint.unit_price, hint.quantity),
            None => self.accept(name, price, 1),
        }
    }

    /// Buffered text that reads as part of a name, joined oldest first.
    fn buffered_name(&self, buffer: &LineBuffer) -> String {
        let fragments: Vec<&str> = buffer
            .iter()
            .filter(|l| QuantityHint::parse(l).is_none() && self.is_name_fragment(l))
            .collect();
        clean_name(&fragments.join(" "))
    }

    fn is_name_fragment(&self, line: &str) -> bool {
        !is_noisy(line, self.noise_ratio) && line.chars().any(char::is_alphabetic)
    }

    fn plausible_price(&self, price: Money) -> bool {
        !price.is_zero() && !price.is_negative() && price < self.max_price
    }

    fn accept(&self, name: String, unit_price: Money, quantity: u32) -> Option<LineItem> {
        if !valid_name(&name) {
            debug!(item = %name, "rejected item: name");
            return None;
        }
        if !self.plausible_price(unit_price) {
            debug!(item = %name, %unit_price, "rejected item: price out of range");
            return None;
        }
        Some(LineItem::new(name, unit_price, quantity))
    }
}
