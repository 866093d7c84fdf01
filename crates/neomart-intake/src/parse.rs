//! Free-text order parsing.
//!
//! Turns a semi-structured order message (Arabic labels, one item per
//! numbered line) into an [`Order`]. Customer fields are `label: value`
//! lines; items follow the shape
//! `<n>. <name>، كمية <qty>، السعر <price>، متجر: <store>`.
//!
//! Item lines whose quantity or price cannot be read are skipped and
//! reported as [`ItemIssue`]s instead of producing a half-valid item.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use neomart_core::{generate_product_id, LineItem, Order, StoreDirectory, DEFAULT_DELIVERY_COST};
use regex::Regex;

use crate::error::ParseError;

/// Largest order text accepted by [`OrderParser::parse`].
pub const MAX_INPUT_BYTES: usize = 64 * 1024;

pub(crate) const CITY_BAGHDAD: &str = "بغداد";
pub(crate) const CITY_OTHER_GOVERNORATES: &str = "محافظات أخرى";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| field_regex(r"الاسم|name"));
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    field_regex(r"(?:رقم[ \t]+)?الهاتف|phone(?:[ \t]+number)?|mobile")
});
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| field_regex(r"العنوان|address"));
static CITY_RE: LazyLock<Regex> = LazyLock::new(|| field_regex(r"المدينة|city"));
static NOTES_RE: LazyLock<Regex> = LazyLock::new(|| field_regex(r"ملاحظات|notes?"));

static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)(\d+)\.[ \t]*([^،\n]+?)[ \t]*،[ \t]*كمية[ \t]*([^،\n]*?)[ \t]*،[ \t]*السعر[ \t]*([^،\n]*?)[ \t]*،[ \t]*متجر[: \t]*([^\n]*)",
    )
    .expect("valid item regex")
});

/// Builds a line-anchored, case-insensitive `label: value` matcher.
///
/// Leading list bullets are tolerated; `-` also works as the separator.
fn field_regex(labels: &str) -> Regex {
    Regex::new(&format!(
        r"(?mi)^[ \t\-*•]*(?:{labels})[ \t]*[:\-][ \t]*(.+)$"
    ))
    .expect("valid field regex")
}

/// Which numeric field of an item line was unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Quantity,
    Price,
}

impl std::fmt::Display for ItemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemField::Quantity => write!(f, "quantity"),
            ItemField::Price => write!(f, "price"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    /// Nothing was written after the label.
    Missing,
    /// Something was written but it is not an acceptable number.
    Invalid { raw: String },
}

/// An item line that was recognized but left out of the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIssue {
    /// 1-based position among item lines, in document order.
    pub position: usize,
    pub product_name: String,
    pub field: ItemField,
    pub problem: FieldProblem,
}

impl std::fmt::Display for ItemIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.problem {
            FieldProblem::Missing => write!(
                f,
                "item {} ({}): {} is missing",
                self.position, self.product_name, self.field
            ),
            FieldProblem::Invalid { raw } => write!(
                f,
                "item {} ({}): {} '{raw}' is not valid",
                self.position, self.product_name, self.field
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedOrder {
    pub order: Order,
    pub issues: Vec<ItemIssue>,
}

/// Parses order text against a store directory and delivery charge.
#[derive(Debug, Clone)]
pub struct OrderParser {
    stores: StoreDirectory,
    delivery_cost: i64,
}

impl Default for OrderParser {
    fn default() -> Self {
        Self::new(StoreDirectory::default(), DEFAULT_DELIVERY_COST)
    }
}

impl OrderParser {
    #[must_use]
    pub fn new(stores: StoreDirectory, delivery_cost: i64) -> Self {
        Self {
            stores,
            delivery_cost,
        }
    }

    /// Parses `text` into an order with a fresh order code and idempotency key.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InputTooLarge`] if `text` exceeds
    /// [`MAX_INPUT_BYTES`].
    pub fn parse(&self, text: &str) -> Result<ParsedOrder, ParseError> {
        self.parse_at(text, Utc::now())
    }

    pub(crate) fn parse_at(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ParsedOrder, ParseError> {
        if text.len() > MAX_INPUT_BYTES {
            return Err(ParseError::InputTooLarge {
                len: text.len(),
                max: MAX_INPUT_BYTES,
            });
        }

        let mut order = Order::new(self.delivery_cost, now);
        order.customer_name = first_field(&NAME_RE, text);
        order.customer_phone = first_field(&PHONE_RE, text);
        order.customer_address = first_field(&ADDRESS_RE, text);
        order.customer_city = first_field(&CITY_RE, text);
        order.customer_notes = first_field(&NOTES_RE, text);

        let (items, issues) = self.extract_items(text, now.timestamp_millis());
        order.items = items;
        order.recompute_totals();

        if order.customer_city.is_empty() && !order.customer_address.is_empty() {
            order.customer_city = infer_city(&order.customer_address).to_string();
        }

        if let Some(first) = order.items.first() {
            order.main_store_name = first.main_store_name.clone();
        }

        for issue in &issues {
            tracing::warn!(
                order_code = %order.order_code,
                position = issue.position,
                field = %issue.field,
                "skipping order line: {issue}"
            );
        }
        tracing::debug!(
            order_code = %order.order_code,
            items = order.items.len(),
            skipped = issues.len(),
            subtotal = order.subtotal,
            "parsed order text"
        );

        Ok(ParsedOrder { order, issues })
    }

    fn extract_items(&self, text: &str, now_millis: i64) -> (Vec<LineItem>, Vec<ItemIssue>) {
        let mut items = Vec::new();
        let mut issues = Vec::new();

        for (idx, caps) in ITEM_RE.captures_iter(text).enumerate() {
            let position = idx + 1;
            let product_name = caps[2].trim().to_string();
            let store_name = caps[5].trim().to_string();

            let quantity = parse_quantity(&caps[3]);
            let price = parse_price(&caps[4]);

            let mut line_issue = |field, problem| {
                issues.push(ItemIssue {
                    position,
                    product_name: product_name.clone(),
                    field,
                    problem,
                });
            };

            let (quantity, price) = match (quantity, price) {
                (Ok(q), Ok(p)) => (q, p),
                (q, p) => {
                    if let Err(problem) = q {
                        line_issue(ItemField::Quantity, problem);
                    }
                    if let Err(problem) = p {
                        line_issue(ItemField::Price, problem);
                    }
                    continue;
                }
            };

            items.push(LineItem {
                product_id: generate_product_id(&product_name, now_millis),
                assigned_store_id: self.stores.store_id(&store_name).map(str::to_owned),
                product_name,
                quantity,
                price,
                discounted_price: None,
                main_store_name: store_name,
            });
        }

        (items, issues)
    }
}

/// Parses with the built-in store table and default delivery cost.
///
/// # Errors
///
/// See [`OrderParser::parse`].
pub fn parse_order_text(text: &str) -> Result<ParsedOrder, ParseError> {
    OrderParser::default().parse(text)
}

fn first_field(re: &Regex, text: &str) -> String {
    re.captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn infer_city(address: &str) -> &'static str {
    let lower = address.to_lowercase();
    if lower.contains(CITY_BAGHDAD) || lower.contains("baghdad") {
        CITY_BAGHDAD
    } else {
        CITY_OTHER_GOVERNORATES
    }
}

/// Maps Arabic-Indic and Eastern Arabic-Indic digits to ASCII and drops
/// thousands separators.
fn normalize_digits(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '٬' | '_'))
        .map(|c| match c {
            '٠'..='٩' => char::from_digit(u32::from(c) - u32::from('٠'), 10).unwrap_or(c),
            '۰'..='۹' => char::from_digit(u32::from(c) - u32::from('۰'), 10).unwrap_or(c),
            other => other,
        })
        .collect()
}

fn parse_quantity(raw: &str) -> Result<u32, FieldProblem> {
    let normalized = normalize_digits(raw);
    if normalized.is_empty() {
        return Err(FieldProblem::Missing);
    }
    match normalized.parse::<u32>() {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(FieldProblem::Invalid {
            raw: raw.trim().to_string(),
        }),
    }
}

fn parse_price(raw: &str) -> Result<i64, FieldProblem> {
    let normalized = normalize_digits(raw);
    if normalized.is_empty() {
        return Err(FieldProblem::Missing);
    }
    match normalized.parse::<i64>() {
        Ok(p) if p >= 0 => Ok(p),
        _ => Err(FieldProblem::Invalid {
            raw: raw.trim().to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
