//! # subs-supabase
//!
//! Supabase record store for subs-webhook-rs.
//!
//! `SupabaseStore` implements `subs_core::RecordStore` against the project's
//! REST API using the service role key. The `subscriptions` table is
//! expected to carry a unique constraint on `stripe_subscription_id`, so
//! redelivered checkout events surface as conflicts instead of duplicate
//! rows:
//!
//! ```sql
//! alter table subscriptions
//!     add constraint subscriptions_stripe_subscription_id_key
//!     unique (stripe_subscription_id);
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use subs_supabase::SupabaseStore;
//!
//! let store = SupabaseStore::from_env()?;
//! store.insert("subscriptions", row).await?;
//! ```

pub mod client;
pub mod config;

// Re-exports
pub use client::SupabaseStore;
pub use config::SupabaseConfig;
