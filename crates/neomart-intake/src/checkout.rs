//! Cart checkout preparation.
//!
//! Turns cart items and customer details into the orders to submit: a single
//! order for unified shipping, or one order per store for fast shipping.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use neomart_core::{LineItem, Order, ShippingType, StoreDirectory, DEFAULT_DELIVERY_COST};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store name used when a cart item carries none.
pub const UNKNOWN_STORE: &str = "غير معروف";
/// `main_store_name` of a unified order spanning several stores.
pub const MULTIPLE_STORES: &str = "متعدد المتاجر";
const UNKNOWN_PRODUCT: &str = "منتج غير معروف";

/// One cart line as stored by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(default, alias = "id")]
    pub product_id: String,
    #[serde(default, alias = "product_name")]
    pub name: String,
    /// Signed so that bad cart data can be detected and dropped.
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub discounted_price: Option<i64>,
    #[serde(default, alias = "store_name", alias = "main_store")]
    pub main_store_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub notes: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    pub delivery_cost: i64,
    pub stores: StoreDirectory,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            delivery_cost: DEFAULT_DELIVERY_COST,
            stores: StoreDirectory::default(),
        }
    }
}

/// Orders ready for submission, plus what was cleaned out of the cart.
#[derive(Debug, Clone)]
pub struct PreparedCheckout {
    pub shipping_type: ShippingType,
    pub orders: Vec<Order>,
    /// Cart lines removed for a missing id, non-positive quantity or
    /// negative price.
    pub dropped_items: usize,
    /// Cart lines folded into an earlier line with the same product id.
    pub merged_items: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("missing required customer field: {0}")]
    MissingCustomerField(&'static str),

    #[error("no valid items left in cart after validation")]
    NoValidItems,
}

/// Prepares `cart` for submission.
///
/// # Errors
///
/// Returns [`CheckoutError::EmptyCart`] for an empty cart,
/// [`CheckoutError::MissingCustomerField`] when the customer name or phone is
/// blank, and [`CheckoutError::NoValidItems`] when every cart line is invalid.
pub fn prepare_checkout(
    cart: &[CartItem],
    customer: &Customer,
    shipping: ShippingType,
    options: &CheckoutOptions,
) -> Result<PreparedCheckout, CheckoutError> {
    prepare_checkout_at(cart, customer, shipping, options, Utc::now())
}

pub(crate) fn prepare_checkout_at(
    cart: &[CartItem],
    customer: &Customer,
    shipping: ShippingType,
    options: &CheckoutOptions,
    now: DateTime<Utc>,
) -> Result<PreparedCheckout, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if customer.name.trim().is_empty() {
        return Err(CheckoutError::MissingCustomerField("name"));
    }
    if customer.phone.trim().is_empty() {
        return Err(CheckoutError::MissingCustomerField("phone"));
    }

    let mut items: Vec<LineItem> = Vec::with_capacity(cart.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut dropped_items = 0;
    let mut merged_items = 0;

    for entry in cart {
        let Some(item) = clean_item(entry, &options.stores) else {
            tracing::warn!(
                product_id = %entry.product_id,
                quantity = entry.quantity,
                price = entry.price,
                "dropping invalid cart item"
            );
            dropped_items += 1;
            continue;
        };
        if let Some(&idx) = positions.get(&item.product_id) {
            let existing = &mut items[idx];
            existing.quantity = existing.quantity.saturating_add(item.quantity);
            tracing::debug!(
                product_id = %existing.product_id,
                quantity = existing.quantity,
                "merged duplicate cart item"
            );
            merged_items += 1;
        } else {
            positions.insert(item.product_id.clone(), items.len());
            items.push(item);
        }
    }

    if items.is_empty() {
        return Err(CheckoutError::NoValidItems);
    }

    let orders = match shipping {
        ShippingType::Unified => {
            let main_store = unified_store_name(&items);
            vec![build_order(customer, items, main_store, shipping, options, now)]
        }
        ShippingType::Fast => group_by_store(items)
            .into_iter()
            .map(|(store, group)| build_order(customer, group, store, shipping, options, now))
            .collect(),
    };

    tracing::info!(
        shipping = %shipping,
        orders = orders.len(),
        dropped_items,
        merged_items,
        "prepared checkout"
    );

    Ok(PreparedCheckout {
        shipping_type: shipping,
        orders,
        dropped_items,
        merged_items,
    })
}

fn clean_item(entry: &CartItem, stores: &StoreDirectory) -> Option<LineItem> {
    let product_id = entry.product_id.trim();
    if product_id.is_empty() || entry.price < 0 {
        return None;
    }
    let quantity = u32::try_from(entry.quantity).ok().filter(|q| *q > 0)?;

    let store = match entry.main_store_name.trim() {
        "" => UNKNOWN_STORE.to_owned(),
        name => name.to_owned(),
    };
    let product_name = match entry.name.trim() {
        "" => UNKNOWN_PRODUCT.to_owned(),
        name => name.to_owned(),
    };

    Some(LineItem {
        product_id: product_id.to_owned(),
        product_name,
        quantity,
        price: entry.price,
        discounted_price: entry.discounted_price.filter(|p| *p > 0),
        assigned_store_id: stores.store_id(&store).map(str::to_owned),
        main_store_name: store,
    })
}

fn unified_store_name(items: &[LineItem]) -> String {
    let first = &items[0].main_store_name;
    if items.iter().all(|i| &i.main_store_name == first) {
        first.clone()
    } else {
        MULTIPLE_STORES.to_owned()
    }
}

/// Groups items by store, keeping stores and items in first-appearance order.
fn group_by_store(items: Vec<LineItem>) -> Vec<(String, Vec<LineItem>)> {
    let mut groups: Vec<(String, Vec<LineItem>)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(store, _)| *store == item.main_store_name) {
            Some((_, group)) => group.push(item),
            None => groups.push((item.main_store_name.clone(), vec![item])),
        }
    }
    groups
}

fn build_order(
    customer: &Customer,
    items: Vec<LineItem>,
    main_store_name: String,
    shipping: ShippingType,
    options: &CheckoutOptions,
    now: DateTime<Utc>,
) -> Order {
    let mut order = Order::new(options.delivery_cost, now);
    order.customer_name = customer.name.trim().to_owned();
    order.customer_phone = customer.phone.trim().to_owned();
    order.customer_address = customer.address.trim().to_owned();
    order.customer_city = customer.city.trim().to_owned();
    order.customer_notes = customer.notes.trim().to_owned();
    order.user_id = customer
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned);
    order.items = items;
    order.main_store_name = main_store_name;
    order.shipping_type = Some(shipping);
    order.recompute_totals();
    order
}

#[cfg(test)]
#[path = "checkout_test.rs"]
mod tests;
