//! # Event Verifier Trait
//!
//! Boundary to the payment provider's webhook authentication. The processor
//! calls `verify_and_parse` before touching any byte of the body; an `Event`
//! only exists once this has returned `Ok`.

use crate::error::SignatureError;
use crate::event::Event;
use secrecy::SecretString;
use std::sync::Arc;

/// Authenticates a raw webhook body and parses it into an `Event`.
pub trait EventVerifier: Send + Sync {
    /// Verify `signature` over `payload` with `secret`, then parse.
    ///
    /// # Arguments
    /// * `payload` - Raw request body bytes, exactly as received
    /// * `signature` - Signature header value
    /// * `secret` - Pre-shared signing secret
    fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &SecretString,
    ) -> Result<Event, SignatureError>;

    /// Get the provider name (for logging and routing).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared verifier (dynamic dispatch)
pub type BoxedEventVerifier = Arc<dyn EventVerifier>;
