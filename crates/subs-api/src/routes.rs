//! # Routes
//!
//! Axum router configuration for the webhook API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router
///
/// Routes:
/// - GET  /health - Health check (also served at /)
/// - POST /api/stripe/webhook - Stripe webhook handler
pub fn create_router(state: AppState) -> Router {
    // Webhook routes (must accept raw body; no JSON extractor)
    let webhook_routes = Router::new().route("/webhook", post(handlers::stripe_webhook));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // Provider webhooks
        .nest("/api/stripe", webhook_routes)
        // Middleware
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        // State
        .with_state(state)
}
