//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the webhook processor and the server configuration, both built
//! once at startup.

use anyhow::Context;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use subs_core::{
    BoxedRecordStore, MemoryStore, ProcessorConfig, StoreFailurePolicy, WebhookProcessor,
    DEFAULT_SUBSCRIPTIONS_TABLE, SUBSCRIPTION_ID_COLUMN,
};
use subs_stripe::{StripeConfig, StripeWebhookVerifier};
use subs_supabase::SupabaseStore;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_format: std::env::var("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Where subscription rows are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Supabase,
    /// In-process only; rows are lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown store backend: {}", other),
        }
    }
}

/// Non-secret webhook settings.
///
/// Read from `config/webhook.toml` when present; environment variables
/// override the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub subscriptions_table: String,
    pub store_failure: StoreFailurePolicy,
    pub store_backend: StoreBackend,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            subscriptions_table: DEFAULT_SUBSCRIPTIONS_TABLE.to_string(),
            store_failure: StoreFailurePolicy::default(),
            store_backend: StoreBackend::default(),
        }
    }
}

impl WebhookSettings {
    /// Load from the settings file (if any), then apply env overrides
    pub fn load() -> anyhow::Result<Self> {
        let mut settings = load_settings_file()?;
        settings.apply_env()?;
        Ok(settings)
    }

    /// Parse a settings file body
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse webhook settings")
    }

    /// Reject settings unsafe for `config`'s environment
    pub fn check_environment(&self, config: &AppConfig) -> anyhow::Result<()> {
        if config.is_production() && self.store_backend == StoreBackend::Memory {
            anyhow::bail!("STORE_BACKEND=memory is not allowed in production");
        }
        Ok(())
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(table) = std::env::var("SUBSCRIPTIONS_TABLE") {
            self.subscriptions_table = table;
        }
        if let Ok(policy) = std::env::var("STORE_FAILURE_POLICY") {
            self.store_failure = policy
                .parse::<StoreFailurePolicy>()
                .map_err(|e| anyhow::anyhow!("STORE_FAILURE_POLICY: {}", e))?;
        }
        if let Ok(backend) = std::env::var("STORE_BACKEND") {
            self.store_backend = backend.parse::<StoreBackend>().context("STORE_BACKEND")?;
        }
        if self.subscriptions_table.trim().is_empty() {
            anyhow::bail!("subscriptions table name is empty");
        }
        Ok(())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Webhook processor
    pub processor: Arc<WebhookProcessor>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build the Stripe verifier, record store and processor from the environment
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let settings = WebhookSettings::load()?;
        settings.check_environment(&config)?;

        let stripe = StripeConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        let store: BoxedRecordStore = match settings.store_backend {
            StoreBackend::Supabase => Arc::new(
                SupabaseStore::from_env()
                    .map_err(|e| anyhow::anyhow!("Failed to initialize Supabase: {}", e))?,
            ) as BoxedRecordStore,
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory record store; rows are lost on restart");
                Arc::new(
                    MemoryStore::new()
                        .with_unique(settings.subscriptions_table.clone(), SUBSCRIPTION_ID_COLUMN),
                ) as BoxedRecordStore
            }
        };

        let processor_config = ProcessorConfig::new(stripe.webhook_secret.clone())
            .with_subscriptions_table(settings.subscriptions_table)
            .with_store_failure(settings.store_failure);

        let processor = WebhookProcessor::new(
            Arc::new(StripeWebhookVerifier::from_config(&stripe)),
            store,
            processor_config,
        );

        Ok(Self::from_parts(processor, config))
    }

    /// Assemble state from an already-built processor
    pub fn from_parts(processor: WebhookProcessor, config: AppConfig) -> Self {
        Self {
            processor: Arc::new(processor),
            config,
        }
    }
}

/// Load webhook settings from config file
fn load_settings_file() -> anyhow::Result<WebhookSettings> {
    let config_paths = [
        "config/webhook.toml",
        "../config/webhook.toml",
        "../../config/webhook.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let settings = WebhookSettings::from_toml_str(&content)
                .with_context(|| format!("Failed to parse {}", path))?;
            tracing::info!("Loaded webhook settings from {}", path);
            return Ok(settings);
        }
    }

    tracing::debug!("No webhook settings file found, using defaults");
    Ok(WebhookSettings::default())
}
