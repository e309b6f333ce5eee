//! # Record Store Trait
//!
//! Boundary to the backend holding subscription rows. Implementations:
//! Supabase (PostgREST) in `subs-supabase`, and the in-process
//! `MemoryStore` below for local runs and tests.

use crate::error::{StoreError, StoreResult};
use crate::subscription::MatchFilter;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Table-oriented persistence used by the webhook processor.
///
/// Records and patches are JSON objects keyed by column name.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one row.
    ///
    /// Must return `StoreError::Conflict` when a unique column collides.
    async fn insert(&self, table: &str, record: Value) -> StoreResult<()>;

    /// Apply `patch` to every row matching `filter`.
    ///
    /// Returns the number of rows changed; zero is not an error.
    async fn update(&self, table: &str, patch: Value, filter: &MatchFilter) -> StoreResult<u64>;

    /// Backend name (for logging).
    fn backend_name(&self) -> &'static str;
}

/// Type alias for a shared record store (dynamic dispatch)
pub type BoxedRecordStore = Arc<dyn RecordStore>;

/// In-process record store.
///
/// Rows get an `id` and `created_at` on insert when they lack one, like the
/// database defaults on the real table. Unique columns are opt-in per table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryTables>>,
}

#[derive(Default)]
struct MemoryTables {
    rows: HashMap<String, Vec<Map<String, Value>>>,
    unique: HashMap<String, HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: enforce uniqueness of `column` within `table`
    pub fn with_unique(self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.lock()
            .unique
            .entry(table.into())
            .or_default()
            .insert(column.into());
        self
    }

    /// Snapshot of every row in `table`
    pub fn rows(&self, table: &str) -> Vec<Map<String, Value>> {
        self.lock().rows.get(table).cloned().unwrap_or_default()
    }

    /// Number of rows in `table`
    pub fn len(&self, table: &str) -> usize {
        self.lock().rows.get(table).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryTables> {
        // Each write completes under the lock, so a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, table: &str, record: Value) -> StoreResult<()> {
        let Value::Object(mut row) = record else {
            return Err(StoreError::Serialization(
                "record must be a JSON object".to_string(),
            ));
        };

        let mut tables = self.lock();

        if let Some(columns) = tables.unique.get(table) {
            let existing = tables.rows.get(table).map(Vec::as_slice).unwrap_or(&[]);
            for column in columns {
                let Some(value) = row.get(column).filter(|v| !v.is_null()) else {
                    continue;
                };
                if existing.iter().any(|r| r.get(column) == Some(value)) {
                    return Err(StoreError::Conflict {
                        table: table.to_string(),
                        message: format!("duplicate value for unique column {}", column),
                    });
                }
            }
        }

        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        tables.rows.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    async fn update(&self, table: &str, patch: Value, filter: &MatchFilter) -> StoreResult<u64> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::Serialization(
                "patch must be a JSON object".to_string(),
            ));
        };

        let mut tables = self.lock();
        let Some(rows) = tables.rows.get_mut(table) else {
            return Ok(0);
        };

        let mut changed = 0;
        for row in rows.iter_mut() {
            let matches = row
                .get(&filter.column)
                .and_then(Value::as_str)
                .is_some_and(|v| v == filter.value);
            if matches {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_defaults() {
        let store = MemoryStore::new();
        store
            .insert("subscriptions", json!({ "user_id": "u1" }))
            .await
            .unwrap();

        let rows = store.rows("subscriptions");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].get("id").is_some());
        assert!(rows[0].get("created_at").is_some());
    }

    #[tokio::test]
    async fn test_unique_column_conflict() {
        let store = MemoryStore::new().with_unique("subscriptions", "stripe_subscription_id");
        let record = json!({ "stripe_subscription_id": "sub_1" });

        store.insert("subscriptions", record.clone()).await.unwrap();
        let err = store.insert("subscriptions", record).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(store.len("subscriptions"), 1);
    }

    #[tokio::test]
    async fn test_unique_is_per_table() {
        let store = MemoryStore::new().with_unique("subscriptions", "stripe_subscription_id");
        let record = json!({ "stripe_subscription_id": "sub_1" });

        store.insert("archive", record.clone()).await.unwrap();
        store.insert("archive", record.clone()).await.unwrap();
        store.insert("subscriptions", record).await.unwrap();

        assert_eq!(store.len("archive"), 2);
        assert_eq!(store.len("subscriptions"), 1);
    }

    #[tokio::test]
    async fn test_update_matching_rows() {
        let store = MemoryStore::new();
        store
            .insert("subscriptions", json!({ "stripe_subscription_id": "sub_1", "status": "active" }))
            .await
            .unwrap();
        store
            .insert("subscriptions", json!({ "stripe_subscription_id": "sub_2", "status": "active" }))
            .await
            .unwrap();

        let changed = store
            .update(
                "subscriptions",
                json!({ "status": "canceled" }),
                &MatchFilter::subscription("sub_1"),
            )
            .await
            .unwrap();

        assert_eq!(changed, 1);
        let rows = store.rows("subscriptions");
        assert_eq!(rows[0]["status"], "canceled");
        assert_eq!(rows[1]["status"], "active");
    }

    #[tokio::test]
    async fn test_update_without_match_is_noop() {
        let store = MemoryStore::new();
        let changed = store
            .update(
                "subscriptions",
                json!({ "status": "canceled" }),
                &MatchFilter::subscription("sub_missing"),
            )
            .await
            .unwrap();
        assert_eq!(changed, 0);
        assert!(store.is_empty("subscriptions"));
    }

    #[tokio::test]
    async fn test_rejects_non_object_record() {
        let store = MemoryStore::new();
        let err = store.insert("subscriptions", json!(["nope"])).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
