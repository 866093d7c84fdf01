//! HTTP client for the order-intake function.
//!
//! One call to [`OrderClient::submit`] is one `POST` with a freshly
//! serialized body. The response is classified into transport failure,
//! HTTP rejection, application rejection or acceptance; nothing is retried
//! here.

use std::time::Duration;

use futures::future::join_all;
use neomart_core::{AppConfig, Order};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{IntakeError, SubmitError};
use crate::parse::{OrderParser, ParsedOrder};

const DEFAULT_USER_AGENT: &str = "neomart/0.1 (order-intake)";

/// The envelope fields read from an intake response. A missing `success`
/// counts as not accepted.
#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// A response with `"success": true`, kept as the raw payload since the
/// confirmation fields are defined by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAcceptance {
    pub payload: Value,
}

impl OrderAcceptance {
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(Value::as_str)
    }

    /// Confirmation objects, whether the backend answered with an `orders`
    /// list, a single `order`, or flat top-level fields.
    #[must_use]
    pub fn confirmed_orders(&self) -> Vec<&Value> {
        for key in ["orders", "order", "data"] {
            match self.payload.get(key) {
                Some(Value::Array(list)) => return list.iter().filter(|v| v.is_object()).collect(),
                Some(obj @ Value::Object(_)) => return vec![obj],
                _ => {}
            }
        }
        vec![&self.payload]
    }

    #[must_use]
    pub fn order_codes(&self) -> Vec<String> {
        self.confirmed_orders()
            .into_iter()
            .filter_map(|order| {
                order
                    .get("order_code")
                    .or_else(|| order.get("orderCode"))
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .collect()
    }
}

/// Result of one order inside a batch submission.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub order_code: String,
    pub idempotency_key: String,
    pub result: Result<OrderAcceptance, SubmitError>,
}

/// Client for the remote order-intake endpoint.
///
/// Holds no per-order state; concurrent calls are independent.
#[derive(Debug, Clone)]
pub struct OrderClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl OrderClient {
    /// Creates a client posting to `endpoint`.
    ///
    /// `api_key`, when set, is sent as the `apikey` header and as a bearer
    /// token.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::InvalidEndpoint`] if `endpoint` is not an
    /// http(s) URL, or [`SubmitError::Network`] if the `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        endpoint: &str,
        timeout_secs: u64,
        user_agent: &str,
        api_key: Option<&str>,
    ) -> Result<Self, SubmitError> {
        let endpoint_url = Url::parse(endpoint).map_err(|e| SubmitError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint_url.scheme(), "http" | "https") {
            return Err(SubmitError::InvalidEndpoint {
                endpoint: endpoint.to_owned(),
                reason: format!("unsupported scheme '{}'", endpoint_url.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint_url,
            api_key: api_key.map(str::to_owned),
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::InvalidEndpoint`] if no intake URL is
    /// configured, plus the errors of [`OrderClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, SubmitError> {
        let endpoint =
            config
                .order_intake_url
                .as_deref()
                .ok_or_else(|| SubmitError::InvalidEndpoint {
                    endpoint: String::new(),
                    reason: "NEOMART_ORDER_INTAKE_URL is not set".to_owned(),
                })?;
        let user_agent = if config.user_agent.is_empty() {
            DEFAULT_USER_AGENT
        } else {
            &config.user_agent
        };
        Self::new(
            endpoint,
            config.request_timeout_secs,
            user_agent,
            config.api_key.as_deref(),
        )
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends `order` once.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Network`] if no response was received.
    /// - [`SubmitError::ServerRejected`] for a non-2xx status.
    /// - [`SubmitError::InvalidResponse`] for a 2xx body that is not a JSON
    ///   object.
    /// - [`SubmitError::ApplicationRejected`] when `success` is false or absent.
    /// - [`SubmitError::Serialize`] if the order cannot be encoded.
    pub async fn submit(&self, order: &Order) -> Result<OrderAcceptance, SubmitError> {
        // Serialized per call; a request body is never reused across attempts.
        let body = serde_json::to_vec(order).map_err(|source| SubmitError::Serialize {
            order_code: order.order_code.clone(),
            source,
        })?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        tracing::info!(
            order_code = %order.order_code,
            idempotency_key = %order.idempotency_key,
            items = order.items.len(),
            total_amount = order.total_amount,
            "submitting order"
        );

        let response = request.send().await?;
        let status = response.status();
        // A response arrived; a body that breaks off is judged by its status.
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    order_code = %order.order_code,
                    status = status.as_u16(),
                    error = %e,
                    "failed to read response body"
                );
                String::new()
            }
        };

        if !status.is_success() {
            let message = rejection_message(status, &text);
            tracing::warn!(
                order_code = %order.order_code,
                status = status.as_u16(),
                %message,
                "order rejected by server"
            );
            return Err(SubmitError::ServerRejected {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value =
            serde_json::from_str(&text).map_err(|source| SubmitError::InvalidResponse {
                order_code: order.order_code.clone(),
                source,
            })?;
        let envelope = ResponseEnvelope::deserialize(&payload).map_err(|source| {
            SubmitError::InvalidResponse {
                order_code: order.order_code.clone(),
                source,
            }
        })?;

        if envelope.success != Some(true) {
            let message = envelope
                .message
                .or(envelope.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "order was not accepted".to_owned());
            tracing::warn!(
                order_code = %order.order_code,
                %message,
                "order not accepted"
            );
            return Err(SubmitError::ApplicationRejected { message });
        }

        tracing::info!(order_code = %order.order_code, "order accepted");
        Ok(OrderAcceptance { payload })
    }

    /// Submits independent orders concurrently.
    ///
    /// Returns one outcome per order, in input order. Some orders may be
    /// accepted while others fail; nothing is rolled back.
    pub async fn submit_all(&self, orders: &[Order]) -> Vec<SubmissionOutcome> {
        let outcomes: Vec<SubmissionOutcome> = join_all(orders.iter().map(|order| async move {
            SubmissionOutcome {
                order_code: order.order_code.clone(),
                idempotency_key: order.idempotency_key.clone(),
                result: self.submit(order).await,
            }
        }))
        .await;

        let accepted = outcomes.iter().filter(|o| o.result.is_ok()).count();
        tracing::info!(
            accepted,
            failed = outcomes.len() - accepted,
            "batch submission finished"
        );
        outcomes
    }
}

/// Parses `text` and submits the resulting order once.
///
/// # Errors
///
/// Returns [`IntakeError::Parse`] or [`IntakeError::Submit`].
pub async fn send_order_from_text(
    client: &OrderClient,
    parser: &OrderParser,
    text: &str,
) -> Result<(ParsedOrder, OrderAcceptance), IntakeError> {
    let parsed = parser.parse(text)?;
    let acceptance = client.submit(&parsed.order).await?;
    Ok((parsed, acceptance))
}

/// Builds the message for a non-2xx response.
///
/// Prefers the body's `error` then `message` field; falls back to
/// `HTTP <code>: <reason>` when the body is not JSON or has neither.
fn rejection_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["error", "message"].into_iter().find_map(|key| match json.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
                Some(Value::Object(obj)) => obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                _ => None,
            })
        })
        .unwrap_or_else(|| {
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status")
            )
        })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
