//! # subs-stripe
//!
//! Stripe webhook authentication for subs-webhook-rs.
//!
//! Provides `StripeWebhookVerifier`, the `EventVerifier` the processor uses
//! to check the `Stripe-Signature` header before a body is trusted.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use subs_stripe::{StripeConfig, StripeWebhookVerifier};
//!
//! let config = StripeConfig::from_env()?;
//! let verifier = StripeWebhookVerifier::from_config(&config);
//!
//! // In your webhook endpoint:
//! let event = verifier.verify_and_parse(&body, signature, &config.webhook_secret)?;
//! ```
//!
//! ## Local Testing
//!
//! Use the Stripe CLI to forward events to a local server:
//!
//! ```bash
//! stripe listen --forward-to localhost:8080/api/stripe/webhook
//! ```

pub mod config;
pub mod signature;
pub mod webhook;

// Re-exports
pub use config::StripeConfig;
pub use signature::{sign_header, DEFAULT_TOLERANCE_SECS};
pub use webhook::{StripeWebhookVerifier, SIGNATURE_HEADER};
