//! # Supabase Record Store
//!
//! `RecordStore` over the Supabase REST API (PostgREST).
//!
//! - insert: `POST /rest/v1/{table}` with `Prefer: return=minimal`
//! - update: `PATCH /rest/v1/{table}?{column}=eq.{value}` with
//!   `Prefer: return=representation`, so the changed rows can be counted

use crate::config::SupabaseConfig;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use subs_core::{MatchFilter, RecordStore, StoreError, StoreResult};
use tracing::{debug, error, instrument};

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Supabase-backed record store.
///
/// Holds one pooled HTTP client for the life of the process.
#[derive(Clone)]
pub struct SupabaseStore {
    config: SupabaseConfig,
    client: Client,
}

impl SupabaseStore {
    /// Create a new store
    pub fn new(config: SupabaseConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        let config = SupabaseConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let key = self.config.service_role_key.expose_secret();
        self.client
            .request(method, self.config.table_url(table))
            .header("apikey", key.as_str())
            .bearer_auth(key)
    }

    async fn send(&self, table: &str, request: RequestBuilder) -> StoreResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        let parsed = serde_json::from_str::<PostgrestError>(&body).ok();
        let is_unique_violation = parsed
            .as_ref()
            .and_then(|e| e.code.as_deref())
            .is_some_and(|code| code == UNIQUE_VIOLATION);
        let message = parsed
            .and_then(PostgrestError::into_message)
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

        if status == reqwest::StatusCode::CONFLICT || is_unique_violation {
            debug!("Supabase unique violation on {}: {}", table, message);
            return Err(StoreError::Conflict {
                table: table.to_string(),
                message,
            });
        }

        error!("Supabase API error: status={}, body={}", status, body);
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    #[instrument(skip(self, record))]
    async fn insert(&self, table: &str, record: Value) -> StoreResult<()> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(&record);

        self.send(table, request).await?;
        debug!("Inserted row into {}", table);
        Ok(())
    }

    #[instrument(skip(self, patch), fields(column = %filter.column, value = %filter.value))]
    async fn update(&self, table: &str, patch: Value, filter: &MatchFilter) -> StoreResult<u64> {
        let request = self
            .request(Method::PATCH, table)
            .query(&[(filter.column.as_str(), format!("eq.{}", filter.value))])
            .header("Prefer", "return=representation")
            .json(&patch);

        let response = self.send(table, request).await?;
        let rows: Vec<Value> = response.json().await.map_err(|e| {
            StoreError::Serialization(format!("Failed to parse Supabase response: {}", e))
        })?;

        debug!("Updated {} row(s) in {}", rows.len(), table);
        Ok(rows.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}

// =============================================================================
// PostgREST API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl PostgrestError {
    fn into_message(self) -> Option<String> {
        match (self.message, self.details) {
            (Some(message), Some(details)) => Some(format!("{} ({})", message, details)),
            (Some(message), None) => Some(message),
            (None, details) => details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "service-role-test-key";

    fn store(server: &MockServer) -> SupabaseStore {
        SupabaseStore::new(SupabaseConfig::new(server.uri(), KEY)).unwrap()
    }

    fn record() -> Value {
        json!({
            "user_id": "u1",
            "stripe_customer_id": "c1",
            "stripe_subscription_id": "s1",
            "plan": "unknown",
            "status": "active"
        })
    }

    #[tokio::test]
    async fn test_insert_posts_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/subscriptions"))
            .and(header("apikey", KEY))
            .and(header("authorization", format!("Bearer {}", KEY).as_str()))
            .and(header("prefer", "return=minimal"))
            .and(body_json(record()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).insert("subscriptions", record()).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/subscriptions"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "details": "Key (stripe_subscription_id)=(s1) already exists.",
                "hint": null,
                "message": "duplicate key value violates unique constraint"
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .insert("subscriptions", record())
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert!(err.to_string().contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_insert_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let err = store(&server)
            .insert("subscriptions", record())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Rejected { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_update_filters_on_column() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/subscriptions"))
            .and(query_param("stripe_subscription_id", "eq.s1"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({ "status": "canceled" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "stripe_subscription_id": "s1", "status": "canceled" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = store(&server)
            .update(
                "subscriptions",
                json!({ "status": "canceled" }),
                &MatchFilter::subscription("s1"),
            )
            .await
            .unwrap();

        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_update_without_match_returns_zero() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/subscriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let rows = store(&server)
            .update(
                "subscriptions",
                json!({ "status": "canceled" }),
                &MatchFilter::subscription("s_missing"),
            )
            .await
            .unwrap();

        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_bad_request_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "42703",
                "message": "column subscriptions.status does not exist"
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .update(
                "subscriptions",
                json!({ "status": "canceled" }),
                &MatchFilter::subscription("s1"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Rejected { status: 400, .. }));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let config = SupabaseConfig::new("http://127.0.0.1:1", KEY)
            .with_timeout(std::time::Duration::from_secs(2));
        let store = SupabaseStore::new(config).unwrap();

        let err = store.insert("subscriptions", record()).await.unwrap_err();

        assert!(matches!(err, StoreError::Network(_)));
    }
}
