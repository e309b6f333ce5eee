//! # Request Handlers
//!
//! Axum request handlers for the webhook API.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use subs_core::{SignatureError, WebhookError};
use subs_stripe::SIGNATURE_HEADER;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Webhook acknowledgement
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

fn webhook_error_to_response(err: WebhookError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "subs-webhook",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.processor.provider_name(),
        "store": state.processor.store_backend(),
    }))
}

/// Handle Stripe webhook
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, (StatusCode, Json<ErrorResponse>)> {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Webhook rejected: missing Stripe-Signature header");
        return Err(webhook_error_to_response(WebhookError::Unauthorized(
            SignatureError::MissingHeader,
        )));
    };

    let processed = state
        .processor
        .handle(&body, signature)
        .await
        .map_err(|e| {
            match &e {
                // Logged by the processor inside its span
                WebhookError::Unauthorized(_) => {}
                WebhookError::MalformedEvent { .. } => warn!("Webhook rejected: {}", e),
                _ => error!(
                    retryable = e.is_retryable(),
                    "Webhook processing failed: {}",
                    e
                ),
            }
            webhook_error_to_response(e)
        })?;

    info!("Webhook processed: {:?}", processed);

    Ok(Json(WebhookAck::received()))
}
