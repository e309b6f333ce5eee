//! # subs-webhook
//!
//! Stripe subscription webhook service.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export SUPABASE_URL=https://<ref>.supabase.co
//! export SUPABASE_SERVICE_ROLE_KEY=...
//!
//! # Run the server
//! subs-webhook
//! ```

use subs_api::{routes, state::AppState, AppConfig, LogFormat};
use subs_core::EventKind;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    // Initialize logging
    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };
    tracing_subscriber::registry()
        .with(pretty)
        .with(json)
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new(config)?;

    let addr = state.config.socket_addr()?;
    let processor = state.processor.clone();

    info!("Environment: {}", state.config.environment);
    info!(
        "Provider: {}, store: {}, table: {}, on store failure: {}",
        processor.provider_name(),
        processor.store_backend(),
        processor.config().subscriptions_table,
        processor.config().store_failure
    );
    info!("Handled event types: {}", EventKind::HANDLED.join(", "));

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("subs-webhook {} listening on http://{}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
