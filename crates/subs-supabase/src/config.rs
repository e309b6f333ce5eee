//! # Supabase Configuration
//!
//! Connection settings for the Supabase REST API, loaded from the
//! environment.

use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;
use subs_core::StoreError;

/// Supabase connection configuration
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL (https://<ref>.supabase.co)
    pub url: String,

    /// Service role key; bypasses row level security
    pub service_role_key: SecretString,

    /// Request timeout
    pub timeout: Duration,
}

impl SupabaseConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_SERVICE_ROLE_KEY`
    pub fn from_env() -> Result<Self, StoreError> {
        dotenvy::dotenv().ok();

        let url = env::var("SUPABASE_URL")
            .map_err(|_| StoreError::Configuration("SUPABASE_URL not set".to_string()))?;

        let service_role_key = env::var("SUPABASE_SERVICE_ROLE_KEY").map_err(|_| {
            StoreError::Configuration("SUPABASE_SERVICE_ROLE_KEY not set".to_string())
        })?;

        Self::new(url, service_role_key).validated()
    }

    /// Create config with explicit values (for testing)
    pub fn new(url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            service_role_key: SecretString::new(service_role_key.into()),
            timeout: Duration::from_secs(10),
        }
    }

    /// Builder: set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check URL scheme and key presence
    pub fn validated(self) -> Result<Self, StoreError> {
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(StoreError::Configuration(
                "SUPABASE_URL must be an http(s) URL".to_string(),
            ));
        }

        if self.service_role_key.expose_secret().is_empty() {
            return Err(StoreError::Configuration(
                "SUPABASE_SERVICE_ROLE_KEY is empty".to_string(),
            ));
        }

        Ok(self)
    }

    /// REST endpoint for `table`
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        let config = SupabaseConfig::new("https://abc.supabase.co/", "key");
        assert_eq!(
            config.table_url("subscriptions"),
            "https://abc.supabase.co/rest/v1/subscriptions"
        );
    }

    #[test]
    fn test_validation() {
        assert!(SupabaseConfig::new("https://abc.supabase.co", "key")
            .validated()
            .is_ok());
        assert!(SupabaseConfig::new("abc.supabase.co", "key")
            .validated()
            .is_err());
        assert!(SupabaseConfig::new("https://abc.supabase.co", "")
            .validated()
            .is_err());
    }

    #[test]
    fn test_key_not_in_debug_output() {
        let config = SupabaseConfig::new("https://abc.supabase.co", "service-role-secret");
        assert!(!format!("{:?}", config).contains("service-role-secret"));
    }
}
