use thiserror::Error;

/// The order text could not be processed at all.
///
/// Missing customer fields or zero line items are not errors; they yield a
/// structurally empty order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("order text is {len} bytes; the limit is {max}")]
    InputTooLarge { len: usize, max: usize },
}

/// Errors returned by [`crate::OrderClient::submit`].
#[derive(Debug, Error)]
pub enum SubmitError {
    /// No response was received (connect failure, timeout, TLS).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The endpoint answered with a non-success HTTP status.
    #[error("order rejected by server (HTTP {status}): {message}")]
    ServerRejected { status: u16, message: String },

    /// HTTP success, but the payload did not carry `"success": true`.
    #[error("order not accepted: {message}")]
    ApplicationRejected { message: String },

    /// HTTP success with a body that is not the expected JSON envelope.
    #[error("invalid response for order {order_code}: {source}")]
    InvalidResponse {
        order_code: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid order-intake endpoint \"{endpoint}\": {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("failed to serialize order {order_code}: {source}")]
    Serialize {
        order_code: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse classification for choosing a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Check connectivity and try again.
    Connectivity,
    /// The backend failed or refused the request.
    Server,
    /// The backend understood the order and declined it (e.g. duplicate key).
    Rejected,
    /// Client/server disagreement about the wire format.
    Protocol,
}

impl SubmitError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            SubmitError::Network(_) => FailureKind::Connectivity,
            SubmitError::ServerRejected { .. } => FailureKind::Server,
            SubmitError::ApplicationRejected { .. } => FailureKind::Rejected,
            SubmitError::InvalidResponse { .. }
            | SubmitError::InvalidEndpoint { .. }
            | SubmitError::Serialize { .. } => FailureKind::Protocol,
        }
    }

    /// Returns `true` when the message suggests the backend already holds an
    /// order for this idempotency key.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        let message = match self {
            SubmitError::ServerRejected { message, .. }
            | SubmitError::ApplicationRejected { message } => message.to_lowercase(),
            _ => return false,
        };
        message.contains("duplicate") || message.contains("idempotency") || message.contains("مكرر")
    }
}

/// Failure of the combined parse-then-submit flow.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}
