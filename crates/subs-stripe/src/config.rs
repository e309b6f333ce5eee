//! # Stripe Configuration
//!
//! Configuration management for Stripe webhook verification.
//! All secrets are loaded from environment variables.

use crate::signature::DEFAULT_TOLERANCE_SECS;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use subs_core::WebhookError;

/// Stripe webhook configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Webhook signing secret (whsec_...)
    pub webhook_secret: SecretString,

    /// Maximum age of a signed timestamp, in seconds
    pub timestamp_tolerance_secs: i64,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_WEBHOOK_SECRET`
    ///
    /// Optional:
    /// - `STRIPE_WEBHOOK_TOLERANCE_SECS` (default 300)
    pub fn from_env() -> Result<Self, WebhookError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").map_err(|_| {
            WebhookError::Configuration("STRIPE_WEBHOOK_SECRET not set".to_string())
        })?;

        let timestamp_tolerance_secs = match env::var("STRIPE_WEBHOOK_TOLERANCE_SECS") {
            Ok(raw) => raw.parse::<i64>().map_err(|_| {
                WebhookError::Configuration(format!(
                    "STRIPE_WEBHOOK_TOLERANCE_SECS must be an integer, got {:?}",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_TOLERANCE_SECS,
        };

        Self::new(webhook_secret)
            .with_tolerance_secs(timestamp_tolerance_secs)
            .validated()
    }

    /// Create config with explicit values (for testing)
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: SecretString::new(webhook_secret.into()),
            timestamp_tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Builder: set the timestamp tolerance
    pub fn with_tolerance_secs(mut self, secs: i64) -> Self {
        self.timestamp_tolerance_secs = secs;
        self
    }

    /// Check key format and tolerance
    pub fn validated(self) -> Result<Self, WebhookError> {
        if !self.webhook_secret.expose_secret().starts_with("whsec_") {
            return Err(WebhookError::Configuration(
                "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
            ));
        }

        if self.timestamp_tolerance_secs <= 0 {
            return Err(WebhookError::Configuration(
                "STRIPE_WEBHOOK_TOLERANCE_SECS must be positive".to_string(),
            ));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_validation() {
        let config = StripeConfig::new("whsec_abc123").validated().unwrap();
        assert_eq!(config.timestamp_tolerance_secs, DEFAULT_TOLERANCE_SECS);

        assert!(StripeConfig::new("sk_test_abc123").validated().is_err());
        assert!(StripeConfig::new("whsec_abc123")
            .with_tolerance_secs(0)
            .validated()
            .is_err());
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let config = StripeConfig::new("whsec_supersecret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("supersecret"));
    }

    #[test]
    fn test_from_env_missing_key() {
        // Clear any existing env vars
        env::remove_var("STRIPE_WEBHOOK_SECRET");

        let result = StripeConfig::from_env();
        assert!(result.is_err());
    }
}
