use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery charge applied to parsed orders when none is configured.
pub const DEFAULT_DELIVERY_COST: i64 = 5000;

const ORDER_CODE_PREFIX: &str = "ORD-";
const ORDER_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ORDER_CODE_SUFFIX_LEN: usize = 4;
const PRODUCT_ID_SLUG_MAX: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingType {
    /// One order per store, each shipped as soon as that store is ready.
    Fast,
    /// A single order for the whole cart.
    Unified,
}

impl std::fmt::Display for ShippingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShippingType::Fast => write!(f, "fast"),
            ShippingType::Unified => write!(f, "unified"),
        }
    }
}

impl std::str::FromStr for ShippingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(ShippingType::Fast),
            "unified" => Ok(ShippingType::Unified),
            other => Err(format!(
                "invalid shipping type '{other}': must be \"fast\" or \"unified\""
            )),
        }
    }
}

/// One product entry within an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    /// Unit price in whole dinars.
    pub price: i64,
    pub discounted_price: Option<i64>,
    /// `None` when the store name is not in the directory; the backend
    /// assigns a store later.
    pub assigned_store_id: Option<String>,
    pub main_store_name: String,
}

impl LineItem {
    /// `price × quantity`, saturating on overflow.
    #[must_use]
    pub fn line_total(&self) -> i64 {
        self.price.saturating_mul(i64::from(self.quantity))
    }

    #[must_use]
    pub fn discounted_total(&self) -> i64 {
        self.discounted_price
            .unwrap_or(0)
            .saturating_mul(i64::from(self.quantity))
    }
}

/// A transient order, built per submission and serialized as the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub customer_city: String,
    pub customer_notes: String,
    pub items: Vec<LineItem>,
    pub subtotal: i64,
    pub delivery_cost: i64,
    pub total_amount: i64,
    pub discounted_price: Option<i64>,
    pub order_code: String,
    pub main_store_name: String,
    pub user_id: Option<String>,
    pub idempotency_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_type: Option<ShippingType>,
}

impl Order {
    /// Creates an empty order with a fresh order code and idempotency key.
    #[must_use]
    pub fn new(delivery_cost: i64, now: DateTime<Utc>) -> Self {
        Self {
            customer_name: String::new(),
            customer_phone: String::new(),
            customer_address: String::new(),
            customer_city: String::new(),
            customer_notes: String::new(),
            items: Vec::new(),
            subtotal: 0,
            delivery_cost,
            total_amount: delivery_cost,
            discounted_price: None,
            order_code: generate_order_code(now),
            main_store_name: String::new(),
            user_id: None,
            idempotency_key: generate_idempotency_key(),
            shipping_type: None,
        }
    }

    /// Recomputes `subtotal`, `total_amount` and `discounted_price` from the items.
    ///
    /// Amounts supplied by a caller are never trusted; every constructor in
    /// this workspace ends by calling this.
    pub fn recompute_totals(&mut self) {
        self.subtotal = self
            .items
            .iter()
            .fold(0i64, |sum, item| sum.saturating_add(item.line_total()));
        self.total_amount = self.subtotal.saturating_add(self.delivery_cost);
        let discounted = self
            .items
            .iter()
            .fold(0i64, |sum, item| sum.saturating_add(item.discounted_total()));
        self.discounted_price = (discounted > 0).then_some(discounted);
    }

    /// Total number of units across all items.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// Generates an order code of the form `ORD-YYMMDD-XXXX` for the given date.
#[must_use]
pub fn generate_order_code(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_CODE_SUFFIX_LEN)
        .map(|_| char::from(ORDER_CODE_ALPHABET[rng.random_range(0..ORDER_CODE_ALPHABET.len())]))
        .collect();
    format!("{ORDER_CODE_PREFIX}{}-{suffix}", now.format("%y%m%d"))
}

/// Returns `true` if `code` matches `ORD-\d{6}-[A-Z0-9]{4}`.
#[must_use]
pub fn is_valid_order_code(code: &str) -> bool {
    let Some(rest) = code.strip_prefix(ORDER_CODE_PREFIX) else {
        return false;
    };
    let Some((date, suffix)) = rest.split_once('-') else {
        return false;
    };
    date.len() == 6
        && date.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == ORDER_CODE_SUFFIX_LEN
        && suffix
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// A fresh UUID v4 identifying one submission attempt.
#[must_use]
pub fn generate_idempotency_key() -> String {
    Uuid::new_v4().to_string()
}

/// Derives a product id from its name plus a time-based suffix.
///
/// Whitespace runs become `-`, anything outside `[a-z0-9-]` is dropped, the
/// slug is capped at 50 characters, and the last six digits of
/// `now_millis` are appended. Not globally unique.
#[must_use]
pub fn generate_product_id(product_name: &str, now_millis: i64) -> String {
    let lower = product_name.to_lowercase();
    let mut slug = String::with_capacity(lower.len());
    let mut in_whitespace = false;
    for c in lower.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            slug.push(c);
        }
    }
    let slug: String = slug.chars().take(PRODUCT_ID_SLUG_MAX).collect();
    format!("{slug}-{:06}", now_millis.rem_euclid(1_000_000))
}
