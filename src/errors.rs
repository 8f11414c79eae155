//! Error types for the mutasibank library.
//!
//! Transport failures of the API client are not errors here: they come back as
//! [`ApiResult::Error`](crate::types::ApiResult::Error). This module covers
//! configuration problems, contract violations by the remote service, and the
//! webhook rejection taxonomy.

use http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Main error type for mutasibank operations.
#[derive(Error, Debug)]
pub enum MutasibankError {
    /// Error building or sending an HTTP request
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error parsing URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The API answered with a body that is not a JSON object
    #[error("Invalid response (HTTP {status}): {message}")]
    InvalidResponse {
        /// HTTP status code of the offending response
        status: u16,
        /// Why the body was rejected
        message: String,
    },

    /// A transaction handler failed
    #[error("Handler error: {0}")]
    Handler(String),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

/// Result type alias for mutasibank operations.
pub type Result<T> = std::result::Result<T, MutasibankError>;

/// Reasons an inbound webhook delivery is refused.
///
/// Every variant is terminal for the delivery: no transaction of a refused
/// delivery reaches the caller's handler, except for [`WebhookError::ProcessingFailed`]
/// which is raised by the handler itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// Signature header absent/empty, or timestamp header absent/non-numeric
    #[error("Missing signature headers")]
    MissingSignatureHeaders,

    /// The delivery timestamp is outside the tolerance window
    #[error("Request expired: {timestamp_received} is {difference_seconds}s from {current_time}")]
    RequestExpired {
        /// Timestamp carried by the delivery
        timestamp_received: i64,
        /// Local clock at verification time
        current_time: i64,
        /// Absolute difference between both
        difference_seconds: u64,
    },

    /// HMAC-SHA256 of the raw body does not match the signature header
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is empty, not JSON, or not shaped like a webhook envelope
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Embedded `api_key` differs from the configured token
    #[error("Invalid API token")]
    InvalidApiToken,

    /// The caller's handler failed on one transaction
    #[error("Processing failed for transaction {transaction_id}: {message}")]
    ProcessingFailed {
        /// Identifier of the transaction being handled
        transaction_id: String,
        /// Handler error description
        message: String,
    },
}

impl WebhookError {
    /// Machine-readable kind, used as the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookError::MissingSignatureHeaders => "MissingSignatureHeaders",
            WebhookError::RequestExpired { .. } => "RequestExpired",
            WebhookError::InvalidSignature => "InvalidSignature",
            WebhookError::InvalidPayload(_) => "InvalidPayload",
            WebhookError::InvalidApiToken => "InvalidApiToken",
            WebhookError::ProcessingFailed { .. } => "ProcessingFailed",
        }
    }

    /// Whether this is an authentication-class failure (as opposed to a
    /// malformed-but-genuine sender or a local processing error).
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignatureHeaders
                | WebhookError::RequestExpired { .. }
                | WebhookError::InvalidSignature
                | WebhookError::InvalidApiToken
        )
    }

    /// HTTP status the receiver answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::ProcessingFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// JSON response body with the error kind and diagnostic fields.
    pub fn body(&self) -> Value {
        match self {
            WebhookError::MissingSignatureHeaders => json!({
                "error": self.kind(),
                "message": "X-Mutasibank-Signature and X-Mutasibank-Timestamp required",
            }),
            WebhookError::RequestExpired {
                timestamp_received,
                current_time,
                difference_seconds,
            } => json!({
                "error": self.kind(),
                "message": "Timestamp outside acceptable window",
                "timestamp_received": timestamp_received,
                "current_time": current_time,
                "difference_seconds": difference_seconds,
            }),
            WebhookError::InvalidSignature => json!({
                "error": self.kind(),
                "message": "Webhook signature verification failed",
            }),
            WebhookError::InvalidPayload(reason) => json!({
                "error": self.kind(),
                "message": reason,
            }),
            WebhookError::InvalidApiToken => json!({
                "error": self.kind(),
                "message": "Embedded api_key does not match the configured token",
            }),
            WebhookError::ProcessingFailed {
                transaction_id,
                message,
            } => json!({
                "error": self.kind(),
                "message": message,
                "transaction_id": transaction_id,
            }),
        }
    }
}
