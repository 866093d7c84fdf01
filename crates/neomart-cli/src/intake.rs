//! Order intake command handlers for the CLI.
//!
//! `parse` is offline. `submit` and `checkout` need
//! `NEOMART_ORDER_INTAKE_URL` unless run with `--dry-run`.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use neomart_core::{AppConfig, ShippingType, StoreDirectory};
use neomart_intake::{
    prepare_checkout, submit_with_retry, CartItem, CheckoutOptions, Customer, FailureKind,
    IdempotencyLedger, OrderClient, OrderParser, SubmitError,
};
use serde::Deserialize;

/// Cart file accepted by `checkout`.
#[derive(Debug, Deserialize)]
pub(crate) struct CartFile {
    pub(crate) customer: Customer,
    pub(crate) items: Vec<CartItem>,
}

/// Reads `file`, or stdin when no file is given.
fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read order text from stdin")?;
            Ok(text)
        }
    }
}

/// One-line advice for a failed submission.
pub(crate) fn failure_hint(err: &SubmitError) -> &'static str {
    match err.kind() {
        FailureKind::Connectivity => {
            "could not reach the order service; check the connection and try again"
        }
        FailureKind::Server => "the order service failed to process the order; try again later",
        FailureKind::Rejected if err.is_duplicate() => "the order was already submitted",
        FailureKind::Rejected => "the order was declined",
        FailureKind::Protocol => "unexpected response from the order service",
    }
}

fn build_parser(config: &AppConfig, stores: StoreDirectory) -> OrderParser {
    OrderParser::new(stores, config.default_delivery_cost)
}

/// Parse order text and print the order as pretty JSON on stdout.
///
/// Skipped item lines are logged as warnings.
///
/// # Errors
///
/// Returns an error if the input cannot be read or exceeds the size limit.
pub(crate) fn run_parse(
    config: &AppConfig,
    stores: StoreDirectory,
    file: Option<&Path>,
) -> anyhow::Result<()> {
    let text = read_input(file)?;
    let parsed = build_parser(config, stores).parse(&text)?;

    println!("{}", serde_json::to_string_pretty(&parsed.order)?);
    if !parsed.issues.is_empty() {
        eprintln!("{} item line(s) skipped", parsed.issues.len());
    }
    Ok(())
}

/// Parse order text and submit it once, retrying transient failures.
///
/// Every attempt carries the idempotency key the ledger holds for the
/// order code.
///
/// # Errors
///
/// Returns an error if parsing fails, the endpoint is not configured, or the
/// order is not accepted after all attempts.
pub(crate) async fn run_submit(
    config: &AppConfig,
    stores: StoreDirectory,
    file: Option<&Path>,
    retries: Option<u32>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let text = read_input(file)?;
    let parsed = build_parser(config, stores).parse(&text)?;
    let order = parsed.order;

    if order.items.is_empty() {
        tracing::warn!(order_code = %order.order_code, "order has no items");
    }

    if dry_run {
        println!("dry-run: would submit order {}", order.order_code);
        println!("{}", serde_json::to_string_pretty(&order)?);
        return Ok(());
    }

    let client = OrderClient::from_config(config)?;
    let max_retries = retries.unwrap_or(config.submit_max_retries);

    let ledger = IdempotencyLedger::from_config(config);

    let acceptance = submit_with_retry(
        &client,
        &ledger,
        &order,
        max_retries,
        config.submit_retry_backoff_base_ms,
    )
    .await
    .map_err(|e| {
        let hint = failure_hint(&e);
        anyhow::Error::new(e).context(format!("order {}: {hint}", order.order_code))
    })?;

    println!(
        "accepted {} ({})",
        order.order_code,
        acceptance.message().unwrap_or("no message")
    );
    Ok(())
}

/// Prepare a cart file and submit the resulting orders concurrently.
///
/// Prints one line per order. Orders that were accepted stay accepted even
/// when others fail.
///
/// # Errors
///
/// Returns an error if the cart cannot be read or prepared, the endpoint is
/// not configured, or any order fails.
pub(crate) async fn run_checkout(
    config: &AppConfig,
    stores: StoreDirectory,
    cart_path: &Path,
    shipping: ShippingType,
    dry_run: bool,
) -> anyhow::Result<()> {
    let raw = read_input(Some(cart_path))?;
    let cart: CartFile = serde_json::from_str(&raw)
        .with_context(|| format!("invalid cart file {}", cart_path.display()))?;

    let options = CheckoutOptions {
        delivery_cost: config.default_delivery_cost,
        stores,
    };
    let prepared = prepare_checkout(&cart.items, &cart.customer, shipping, &options)?;

    if prepared.dropped_items > 0 {
        eprintln!("{} invalid cart item(s) dropped", prepared.dropped_items);
    }

    if dry_run {
        println!(
            "dry-run: would submit {} {shipping} order(s)",
            prepared.orders.len()
        );
        println!("{}", serde_json::to_string_pretty(&prepared.orders)?);
        return Ok(());
    }

    let client = OrderClient::from_config(config)?;
    let outcomes = client.submit_all(&prepared.orders).await;

    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(_) => println!("{}\taccepted", outcome.order_code),
            Err(e) => {
                failed += 1;
                println!("{}\tfailed: {} ({e})", outcome.order_code, failure_hint(e));
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} order(s) failed", outcomes.len());
    }
    Ok(())
}
