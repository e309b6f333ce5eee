//! # subs-api
//!
//! HTTP API layer for subs-webhook-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Stripe webhook endpoint feeding the subscription processor
//! - Environment and file based configuration
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/stripe/webhook` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, LogFormat, StoreBackend, WebhookSettings};
