//! Caller-side retry with exponential back-off and jitter.
//!
//! [`crate::OrderClient`] never retries on its own. Callers that want to try
//! again wrap the submission in [`retry_with_backoff`] and resend the *same*
//! order, or use [`submit_with_retry`] to pin the idempotency key through an
//! [`IdempotencyLedger`].

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use neomart_core::Order;
use rand::Rng;

use crate::client::{OrderAcceptance, OrderClient};
use crate::error::SubmitError;
use crate::ledger::IdempotencyLedger;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - [`SubmitError::Network`]: no response was received.
/// - [`SubmitError::ServerRejected`] with a 5xx status.
///
/// **Not retriable:**
/// - 4xx rejections and [`SubmitError::ApplicationRejected`]: the backend
///   made a decision about this order.
/// - [`SubmitError::InvalidResponse`], [`SubmitError::InvalidEndpoint`] and
///   [`SubmitError::Serialize`]: resending the same bytes gives the same result.
#[must_use]
pub fn is_retriable(err: &SubmitError) -> bool {
    match err {
        SubmitError::Network(_) => true,
        SubmitError::ServerRejected { status, .. } => (500..600).contains(status),
        SubmitError::ApplicationRejected { .. }
        | SubmitError::InvalidResponse { .. }
        | SubmitError::InvalidEndpoint { .. }
        | SubmitError::Serialize { .. } => false,
    }
}

/// Longest sleep between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Sleep before retry number `retry` (1-based): `base × 2^(retry-1)`, capped
/// at [`MAX_BACKOFF`], then scaled by a random factor in `[0.75, 1.25]`.
pub(crate) fn backoff_delay(retry: u32, backoff_base_ms: u64) -> Duration {
    let exponent = retry.saturating_sub(1).min(16);
    let nominal = Duration::from_millis(backoff_base_ms.saturating_mul(1 << exponent));
    nominal
        .min(MAX_BACKOFF)
        .mul_f64(rand::rng().random_range(0.75..=1.25))
}

/// Runs `operation` once, then up to `max_retries` more times while it fails
/// with a retriable error.
///
/// The n-th retry waits [`backoff_delay`]`(n, backoff_base_ms)`, so with a
/// 1 s base the waits are roughly 1 s, 2 s, 4 s, … up to 60 s.
///
/// # Errors
///
/// Returns the first non-retriable error, or the last error once the retries
/// are used up.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SubmitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SubmitError>>,
{
    let mut retry = 0u32;
    loop {
        match operation().await {
            Err(err) if retry < max_retries && is_retriable(&err) => {
                retry += 1;
                let delay = backoff_delay(retry, backoff_base_ms);
                tracing::warn!(
                    retry,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    kind = ?err.kind(),
                    error = %err,
                    "order submission failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            outcome => return outcome,
        }
    }
}

/// Submits `order` with retries, taking the idempotency key from `ledger` so
/// that every attempt for the same order code carries the same key.
///
/// # Errors
///
/// See [`retry_with_backoff`] and [`OrderClient::submit`].
pub async fn submit_with_retry(
    client: &OrderClient,
    ledger: &IdempotencyLedger,
    order: &Order,
    max_retries: u32,
    backoff_base_ms: u64,
) -> Result<OrderAcceptance, SubmitError> {
    retry_with_backoff(max_retries, backoff_base_ms, || {
        let mut attempt = order.clone();
        attempt.idempotency_key = ledger.key_for(&order.order_code, Utc::now());
        async move { client.submit(&attempt).await }
    })
    .await
}
