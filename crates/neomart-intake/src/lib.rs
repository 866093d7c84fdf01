//! Order intake: free-text order parsing, checkout preparation, and
//! submission to the remote order-intake function.

pub mod checkout;
pub mod client;
pub mod error;
pub mod ledger;
pub mod parse;
pub mod retry;

pub use checkout::{
    prepare_checkout, CartItem, CheckoutError, CheckoutOptions, Customer, PreparedCheckout,
};
pub use client::{send_order_from_text, OrderAcceptance, OrderClient, SubmissionOutcome};
pub use error::{FailureKind, IntakeError, ParseError, SubmitError};
pub use ledger::IdempotencyLedger;
pub use parse::{
    parse_order_text, FieldProblem, ItemField, ItemIssue, OrderParser, ParsedOrder, MAX_INPUT_BYTES,
};
pub use retry::{is_retriable, retry_with_backoff, submit_with_retry};
