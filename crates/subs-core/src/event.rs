//! # Event Types
//!
//! Verified provider notifications and the typed views the processor reads
//! them through. An `Event` is only ever constructed by an `EventVerifier`,
//! after the signature over the raw body has been checked.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Plan label used when the checkout session carries no usable plan
pub const UNKNOWN_PLAN: &str = "unknown";

/// A verified provider event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Provider event ID (evt_...)
    pub id: String,

    /// Event type tag, e.g. `checkout.session.completed`
    #[serde(rename = "type")]
    pub event_type: String,

    /// Creation time (unix seconds)
    #[serde(default)]
    pub created: i64,

    /// Whether the event came from live mode
    #[serde(default)]
    pub livemode: bool,

    /// Event payload
    pub data: EventData,
}

/// Wrapper around the type-specific object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: Map<String, Value>,
}

impl Event {
    /// Classify the event type
    pub fn kind(&self) -> EventKind {
        EventKind::from_type(&self.event_type)
    }

    /// Creation time as a timestamp
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created, 0)
    }

    /// Deserialize `data.object` into a typed view
    pub fn object_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.data.object.clone()))
    }
}

/// Event types the processor acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckoutSessionCompleted,
    SubscriptionDeleted,
    InvoicePaymentFailed,
    /// Anything else; acknowledged without side effects
    Other,
}

impl EventKind {
    /// Every type tag with a handler, in the order they are dispatched
    pub const HANDLED: &'static [&'static str] = &[
        "checkout.session.completed",
        "customer.subscription.deleted",
        "invoice.payment_failed",
    ];

    /// Exact, case-sensitive match on the provider's type tag
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "checkout.session.completed" => EventKind::CheckoutSessionCompleted,
            "customer.subscription.deleted" => EventKind::SubscriptionDeleted,
            "invoice.payment_failed" => EventKind::InvoicePaymentFailed,
            _ => EventKind::Other,
        }
    }
}

// =============================================================================
// Typed views over `data.object`
// =============================================================================

/// `checkout.session.completed` object.
///
/// `customer`, `subscription` and `metadata.user_id` are required by the
/// processor; `display_items` is kept untyped so a malformed plan path can
/// never fail the event.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub display_items: Option<Value>,
}

impl CheckoutSessionObject {
    pub fn user_id(&self) -> Option<&str> {
        non_empty(self.metadata.get("user_id").map(String::as_str))
    }

    pub fn customer_id(&self) -> Option<&str> {
        non_empty(self.customer.as_deref())
    }

    pub fn subscription_id(&self) -> Option<&str> {
        non_empty(self.subscription.as_deref())
    }

    /// Nickname of the first display item's plan, or `"unknown"`
    pub fn plan_label(&self) -> String {
        self.display_items
            .as_ref()
            .and_then(|items| items.pointer("/0/plan/nickname"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_PLAN)
            .to_string()
    }
}

/// `customer.subscription.*` object
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// `invoice.*` object
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    /// Top-level subscription ID (API versions before 2025-03-31)
    #[serde(default)]
    pub subscription: Option<String>,
    /// Billing parent (API versions from 2025-03-31)
    #[serde(default)]
    pub parent: Option<InvoiceParent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceParent {
    #[serde(default)]
    pub subscription_details: Option<InvoiceSubscriptionDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSubscriptionDetails {
    #[serde(default)]
    pub subscription: Option<String>,
}

impl InvoiceObject {
    /// Subscription the invoice bills, from either payload shape.
    ///
    /// `None` for one-off invoices.
    pub fn subscription_id(&self) -> Option<&str> {
        non_empty(self.subscription.as_deref()).or_else(|| {
            let details = self.parent.as_ref()?.subscription_details.as_ref()?;
            non_empty(details.subscription.as_deref())
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
