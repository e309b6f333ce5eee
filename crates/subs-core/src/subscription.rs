//! # Subscription Records
//!
//! The durable row the processor maintains, plus the patch and filter
//! shapes used to update it. Field names on the wire follow the existing
//! `subscriptions` table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default table holding subscription rows
pub const DEFAULT_SUBSCRIPTIONS_TABLE: &str = "subscriptions";

/// Column that uniquely addresses a subscription row
pub const SUBSCRIPTION_ID_COLUMN: &str = "stripe_subscription_id";

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's subscription row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Application user the subscription belongs to
    pub user_id: String,

    /// Provider customer ID (cus_...)
    #[serde(rename = "stripe_customer_id")]
    pub provider_customer_id: String,

    /// Provider subscription ID (sub_...)
    #[serde(rename = "stripe_subscription_id")]
    pub provider_subscription_id: String,

    /// Plan label, `"unknown"` when the checkout did not carry one
    pub plan: String,

    pub status: SubscriptionStatus,
}

impl SubscriptionRecord {
    /// A freshly activated subscription
    pub fn activated(
        user_id: impl Into<String>,
        provider_customer_id: impl Into<String>,
        provider_subscription_id: impl Into<String>,
        plan: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            provider_customer_id: provider_customer_id.into(),
            provider_subscription_id: provider_subscription_id.into(),
            plan: plan.into(),
            status: SubscriptionStatus::Active,
        }
    }
}

/// Partial update setting only the status column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPatch {
    pub status: SubscriptionStatus,
}

impl StatusPatch {
    pub fn canceled() -> Self {
        Self {
            status: SubscriptionStatus::Canceled,
        }
    }
}

/// Equality predicate selecting the rows an update applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFilter {
    pub column: String,
    pub value: String,
}

impl MatchFilter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Filter on the provider subscription ID column
    pub fn subscription(subscription_id: impl Into<String>) -> Self {
        Self::eq(SUBSCRIPTION_ID_COLUMN, subscription_id)
    }
}
