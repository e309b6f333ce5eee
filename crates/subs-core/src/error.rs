//! # Webhook Error Types
//!
//! Typed error handling for the subscription webhook service.
//! Verification, persistence and processing each get their own enum;
//! `WebhookError` is what the processor hands back to the HTTP layer.

use thiserror::Error;

/// Failure to authenticate an inbound notification.
///
/// Every variant is treated the same way by the processor: the request is
/// rejected as unauthorized and nothing in the body is trusted.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// No signature header on the request
    #[error("missing signature header")]
    MissingHeader,

    /// Header present but not in the `t=...,v1=...` shape
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    /// Signed timestamp too far from the current time
    #[error("timestamp outside tolerance ({age_secs}s > {tolerance_secs}s)")]
    TimestampOutOfTolerance { age_secs: i64, tolerance_secs: i64 },

    /// No provided signature matched the expected one
    #[error("signature mismatch")]
    Mismatch,

    /// Webhook secret empty or not configured
    #[error("webhook secret not configured")]
    MissingSecret,

    /// Signature valid but the body is not a well-formed event
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
}

/// Errors reported by a record store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("conflict writing to {table}: {message}")]
    Conflict { table: String, message: String },

    /// The backend answered with a non-success status
    #[error("store rejected request [{status}]: {message}")]
    Rejected { status: u16, message: String },

    /// Transport failure talking to the backend
    #[error("network error: {0}")]
    Network(String),

    /// Record could not be encoded or response decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend misconfigured (bad URL, missing key)
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Returns true if the write collided with an existing unique row
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Returns true if a later attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Network(_) => true,
            StoreError::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Core error type for webhook processing
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Verification failed; no field of the body was read
    #[error("Webhook verification failed: {0}")]
    Unauthorized(#[from] SignatureError),

    /// Verified event missing a field its handler requires
    #[error("Malformed {event_type} event: {message}")]
    MalformedEvent { event_type: String, message: String },

    /// Persistence failed and the policy asks for redelivery
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Service misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl WebhookError {
    pub fn malformed(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        WebhookError::MalformedEvent {
            event_type: event_type.into(),
            message: message.into(),
        }
    }

    /// Returns true if the provider should redeliver the event
    pub fn is_retryable(&self) -> bool {
        match self {
            WebhookError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::Unauthorized(_) => 401,
            WebhookError::MalformedEvent { .. } => 400,
            WebhookError::Store(_) => 503,
            WebhookError::Configuration(_) => 500,
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for webhook processing
pub type WebhookResult<T> = Result<T, WebhookError>;
