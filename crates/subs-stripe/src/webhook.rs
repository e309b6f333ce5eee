//! # Stripe Webhook Verifier
//!
//! `EventVerifier` implementation for Stripe. The body is only parsed once
//! the `Stripe-Signature` header has been checked against the raw bytes.

use crate::config::StripeConfig;
use crate::signature::{verify_signature, DEFAULT_TOLERANCE_SECS};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use subs_core::{Event, EventVerifier, SignatureError};
use tracing::debug;

/// Name of the header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Stripe webhook verifier
#[derive(Debug, Clone)]
pub struct StripeWebhookVerifier {
    tolerance_secs: i64,
}

impl StripeWebhookVerifier {
    pub fn new(tolerance_secs: i64) -> Self {
        Self { tolerance_secs }
    }

    pub fn from_config(config: &StripeConfig) -> Self {
        Self::new(config.timestamp_tolerance_secs)
    }

    /// Verify and parse against an explicit clock
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &SecretString,
        now: DateTime<Utc>,
    ) -> Result<Event, SignatureError> {
        verify_signature(
            payload,
            signature,
            secret.expose_secret(),
            self.tolerance_secs,
            now,
        )?;

        let event: Event = serde_json::from_slice(payload)
            .map_err(|e| SignatureError::InvalidPayload(e.to_string()))?;

        debug!(event_id = %event.id, event_type = %event.event_type, "Verified Stripe webhook");
        Ok(event)
    }
}

impl Default for StripeWebhookVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_SECS)
    }
}

impl EventVerifier for StripeWebhookVerifier {
    fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &SecretString,
    ) -> Result<Event, SignatureError> {
        self.verify_at(payload, signature, secret, Utc::now())
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}
