//! # subs-core
//!
//! Core types and traits for the subscription webhook service.
//!
//! This crate provides:
//! - `Event` and typed views over provider payloads
//! - `SubscriptionRecord` and the patch/filter shapes used to update it
//! - `EventVerifier` trait for provider webhook authentication
//! - `RecordStore` trait plus the in-process `MemoryStore`
//! - `WebhookProcessor`, which ties the two together
//! - Typed errors for every failure path
//!
//! ## Example
//!
//! ```rust,ignore
//! use subs_core::{MemoryStore, ProcessorConfig, WebhookProcessor};
//!
//! let processor = WebhookProcessor::new(
//!     Arc::new(verifier),
//!     Arc::new(MemoryStore::new()),
//!     ProcessorConfig::new(webhook_secret),
//! );
//!
//! // In your webhook endpoint:
//! match processor.handle(&body, signature).await {
//!     Ok(processed) => { /* reply {"received": true} */ }
//!     Err(e) => { /* reply e.status_code() with {"error": e.to_string()} */ }
//! }
//! ```

pub mod error;
pub mod event;
pub mod processor;
pub mod store;
pub mod subscription;
pub mod verifier;

// Re-exports for convenience
pub use error::{SignatureError, StoreError, StoreResult, WebhookError, WebhookResult};
pub use event::{
    CheckoutSessionObject, Event, EventData, EventKind, InvoiceObject, InvoiceParent,
    InvoiceSubscriptionDetails, SubscriptionObject, UNKNOWN_PLAN,
};
pub use processor::{Processed, ProcessorConfig, StoreFailurePolicy, WebhookProcessor};
pub use store::{BoxedRecordStore, MemoryStore, RecordStore};
pub use subscription::{
    MatchFilter, StatusPatch, SubscriptionRecord, SubscriptionStatus,
    DEFAULT_SUBSCRIPTIONS_TABLE, SUBSCRIPTION_ID_COLUMN,
};
pub use verifier::{BoxedEventVerifier, EventVerifier};
