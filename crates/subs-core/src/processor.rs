//! # Webhook Processor
//!
//! Authenticates an inbound notification, classifies it and issues the
//! matching subscription write.
//!
//! ```text
//!   raw body + signature
//!          │
//!          ▼
//!   EventVerifier::verify_and_parse ──Err──▶ Unauthorized (no store calls)
//!          │ Ok(Event)
//!          ▼
//!   EventKind::from_type
//!     ├── checkout.session.completed    ──▶ insert  {status: active}
//!     ├── customer.subscription.deleted ──┐
//!     ├── invoice.payment_failed        ──┴▶ update  {status: canceled}
//!     └── anything else                 ──▶ no-op
//! ```

use crate::error::{StoreError, WebhookError, WebhookResult};
use crate::event::{
    CheckoutSessionObject, Event, EventKind, InvoiceObject, SubscriptionObject,
};
use crate::store::BoxedRecordStore;
use crate::subscription::{
    MatchFilter, StatusPatch, SubscriptionRecord, DEFAULT_SUBSCRIPTIONS_TABLE,
};
use crate::verifier::BoxedEventVerifier;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, field, info, instrument, warn, Span};

/// What to do when the record store fails a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFailurePolicy {
    /// Log the failure and acknowledge the event anyway
    #[default]
    Acknowledge,
    /// Fail the request so the provider redelivers the event
    Redeliver,
}

impl StoreFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreFailurePolicy::Acknowledge => "acknowledge",
            StoreFailurePolicy::Redeliver => "redeliver",
        }
    }
}

impl fmt::Display for StoreFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreFailurePolicy {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acknowledge" | "ack" => Ok(StoreFailurePolicy::Acknowledge),
            "redeliver" | "retry" => Ok(StoreFailurePolicy::Redeliver),
            other => Err(WebhookError::Configuration(format!(
                "unknown store failure policy: {}",
                other
            ))),
        }
    }
}

/// Processor configuration, built once at startup
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Webhook signing secret (whsec_...)
    pub webhook_secret: SecretString,

    /// Table holding subscription rows
    pub subscriptions_table: String,

    /// Behaviour on a failed store write
    pub store_failure: StoreFailurePolicy,
}

impl ProcessorConfig {
    pub fn new(webhook_secret: SecretString) -> Self {
        Self {
            webhook_secret,
            subscriptions_table: DEFAULT_SUBSCRIPTIONS_TABLE.to_string(),
            store_failure: StoreFailurePolicy::default(),
        }
    }

    /// Builder: write to a different table
    pub fn with_subscriptions_table(mut self, table: impl Into<String>) -> Self {
        self.subscriptions_table = table.into();
        self
    }

    /// Builder: set the store failure policy
    pub fn with_store_failure(mut self, policy: StoreFailurePolicy) -> Self {
        self.store_failure = policy;
        self
    }
}

/// Result of a successfully acknowledged event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// New active subscription inserted
    Activated { subscription_id: String },
    /// Status set to canceled on `rows` matching rows
    Canceled { subscription_id: String, rows: u64 },
    /// Insert hit the unique subscription column; event was a redelivery
    AlreadyRecorded { subscription_id: String },
    /// Write failed and was acknowledged per `StoreFailurePolicy::Acknowledge`
    WriteFailed { subscription_id: String },
    /// Event type (or object) this service does not act on
    Ignored { event_type: String },
}

/// Webhook event processor.
///
/// Stateless between calls; the verifier and store are shared handles.
#[derive(Clone)]
pub struct WebhookProcessor {
    verifier: BoxedEventVerifier,
    store: BoxedRecordStore,
    config: ProcessorConfig,
}

impl WebhookProcessor {
    pub fn new(
        verifier: BoxedEventVerifier,
        store: BoxedRecordStore,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            verifier,
            store,
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.verifier.provider_name()
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Verify, classify and apply one webhook delivery.
    ///
    /// Nothing in `payload` is read before the signature check passes.
    #[instrument(
        skip_all,
        fields(
            provider = self.verifier.provider_name(),
            event_id = field::Empty,
            event_type = field::Empty,
            livemode = field::Empty
        )
    )]
    pub async fn handle(&self, payload: &[u8], signature: &str) -> WebhookResult<Processed> {
        let event = self
            .verifier
            .verify_and_parse(payload, signature, &self.config.webhook_secret)
            .map_err(|e| {
                warn!(error = %e, "Webhook verification failed");
                WebhookError::Unauthorized(e)
            })?;

        let span = Span::current();
        span.record("event_id", event.id.as_str());
        span.record("event_type", event.event_type.as_str());
        span.record("livemode", event.livemode);
        debug!(created_at = ?event.created_at(), "Webhook event verified");

        self.dispatch(&event).await
    }

    async fn dispatch(&self, event: &Event) -> WebhookResult<Processed> {
        match event.kind() {
            EventKind::CheckoutSessionCompleted => self.on_checkout_completed(event).await,
            EventKind::SubscriptionDeleted => {
                let subscription: SubscriptionObject = parse_object(event)?;
                let subscription_id = subscription
                    .id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| missing_field(event, "id"))?;
                self.cancel_subscription(subscription_id).await
            }
            EventKind::InvoicePaymentFailed => {
                let invoice: InvoiceObject = parse_object(event)?;
                match invoice.subscription_id() {
                    Some(subscription_id) => {
                        self.cancel_subscription(subscription_id.to_string()).await
                    }
                    None => {
                        info!(invoice_id = ?invoice.id, "Payment failed on a non-subscription invoice");
                        Ok(Processed::Ignored {
                            event_type: event.event_type.clone(),
                        })
                    }
                }
            }
            EventKind::Other => {
                debug!("Unhandled webhook event type");
                Ok(Processed::Ignored {
                    event_type: event.event_type.clone(),
                })
            }
        }
    }

    async fn on_checkout_completed(&self, event: &Event) -> WebhookResult<Processed> {
        let session: CheckoutSessionObject = parse_object(event)?;

        let user_id = session
            .user_id()
            .ok_or_else(|| missing_field(event, "metadata.user_id"))?;
        let customer_id = session
            .customer_id()
            .ok_or_else(|| missing_field(event, "customer"))?;
        let subscription_id = session
            .subscription_id()
            .ok_or_else(|| missing_field(event, "subscription"))?;

        let record = SubscriptionRecord::activated(
            user_id,
            customer_id,
            subscription_id,
            session.plan_label(),
        );
        let row = serde_json::to_value(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let subscription_id = record.provider_subscription_id;
        match self.store.insert(&self.config.subscriptions_table, row).await {
            Ok(()) => {
                info!(
                    subscription_id = %subscription_id,
                    user_id = %record.user_id,
                    plan = %record.plan,
                    "Recorded active subscription"
                );
                Ok(Processed::Activated { subscription_id })
            }
            Err(e) if e.is_conflict() => {
                info!(subscription_id = %subscription_id, "Subscription already recorded, skipping redelivery");
                Ok(Processed::AlreadyRecorded { subscription_id })
            }
            Err(e) => self.store_failed(subscription_id, e),
        }
    }

    async fn cancel_subscription(&self, subscription_id: String) -> WebhookResult<Processed> {
        let patch = serde_json::to_value(StatusPatch::canceled())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let filter = MatchFilter::subscription(subscription_id.as_str());

        match self
            .store
            .update(&self.config.subscriptions_table, patch, &filter)
            .await
        {
            Ok(rows) => {
                if rows == 0 {
                    info!(subscription_id = %subscription_id, "No subscription row to cancel");
                } else {
                    info!(subscription_id = %subscription_id, rows, "Canceled subscription");
                }
                Ok(Processed::Canceled {
                    subscription_id,
                    rows,
                })
            }
            Err(e) => self.store_failed(subscription_id, e),
        }
    }

    fn store_failed(&self, subscription_id: String, err: StoreError) -> WebhookResult<Processed> {
        error!(
            subscription_id = %subscription_id,
            backend = self.store.backend_name(),
            policy = %self.config.store_failure,
            error = %err,
            "Subscription write failed"
        );
        match self.config.store_failure {
            StoreFailurePolicy::Acknowledge => Ok(Processed::WriteFailed { subscription_id }),
            StoreFailurePolicy::Redeliver => Err(WebhookError::Store(err)),
        }
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &Event) -> WebhookResult<T> {
    event.object_as().map_err(|e| {
        warn!(error = %e, "Event object has unexpected shape");
        WebhookError::malformed(&event.event_type, e.to_string())
    })
}

fn missing_field(event: &Event, name: &str) -> WebhookError {
    warn!(field = name, "Event missing required field");
    WebhookError::malformed(&event.event_type, format!("missing {}", name))
}
