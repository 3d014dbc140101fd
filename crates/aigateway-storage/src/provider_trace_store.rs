use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use time::OffsetDateTime;

use aigateway_common::start_of_today_utc;
use aigateway_provider_core::{ProviderLog, ProviderTraceStore, StoreError, StoreResult};

use crate::entities::provider_logs;

fn backend_err<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Grounded on `examples/original_source/app/storage/provider_logs.py`: each
/// write deletes yesterday-or-older rows in the same transaction as the
/// insert, so the table never holds more than one day's worth of traces.
pub struct SeaOrmProviderTraceStore {
    db: DatabaseConnection,
}

impl SeaOrmProviderTraceStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProviderTraceStore for SeaOrmProviderTraceStore {
    async fn record_provider_log(
        &self,
        provider_id: &str,
        request_body: serde_json::Value,
        response_body: serde_json::Value,
        request_id: Option<&str>,
    ) {
        let txn = match self.db.begin().await {
            Ok(txn) => txn,
            Err(err) => {
                tracing::warn!(event = "provider_trace_begin_failed", error = %err);
                return;
            }
        };

        let active = provider_logs::ActiveModel {
            provider_id: Set(provider_id.to_string()),
            created_at: Set(OffsetDateTime::now_utc()),
            request_id: Set(request_id.map(str::to_string)),
            request_body: Set(request_body),
            response_body: Set(response_body),
            ..Default::default()
        };

        if let Err(err) = active.insert(&txn).await {
            tracing::warn!(event = "provider_trace_write_failed", error = %err);
            return;
        }

        let cutoff = start_of_today_utc();
        if let Err(err) = provider_logs::Entity::delete_many()
            .filter(provider_logs::Column::CreatedAt.lt(cutoff))
            .exec(&txn)
            .await
        {
            tracing::warn!(event = "provider_trace_prune_failed", error = %err);
            return;
        }

        if let Err(err) = txn.commit().await {
            tracing::warn!(event = "provider_trace_commit_failed", error = %err);
        }
    }

    async fn list_provider_logs(&self, provider_id: &str, limit: usize) -> StoreResult<Vec<ProviderLog>> {
        let cutoff = start_of_today_utc();
        let rows = provider_logs::Entity::find()
            .filter(provider_logs::Column::ProviderId.eq(provider_id))
            .filter(provider_logs::Column::CreatedAt.gte(cutoff))
            .order_by_desc(provider_logs::Column::CreatedAt)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(backend_err)?;

        Ok(rows
            .into_iter()
            .map(|row| ProviderLog {
                id: row.id,
                provider_id: row.provider_id,
                created_at: row.created_at,
                request_id: row.request_id,
                request_body: row.request_body,
                response_body: row.response_body,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sync_schema;

    async fn store() -> SeaOrmProviderTraceStore {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        sync_schema(&db).await.unwrap();
        SeaOrmProviderTraceStore::new(db)
    }

    #[tokio::test]
    async fn record_then_list_round_trips_bodies() {
        let store = store().await;
        store
            .record_provider_log(
                "cerebras",
                serde_json::json!({"model": "x"}),
                serde_json::json!({"ok": true}),
                Some("req-1"),
            )
            .await;

        let logs = store.list_provider_logs("cerebras", 100).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].request_body["model"], "x");
        assert_eq!(logs[0].request_id.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn stale_rows_are_pruned_on_write() {
        let store = store().await;
        let stale = provider_logs::ActiveModel {
            provider_id: Set("cerebras".to_string()),
            created_at: Set(OffsetDateTime::now_utc() - time::Duration::days(1)),
            request_body: Set(serde_json::Value::Null),
            response_body: Set(serde_json::Value::Null),
            ..Default::default()
        };
        stale.insert(&store.db).await.unwrap();

        store
            .record_provider_log("cerebras", serde_json::json!({}), serde_json::json!({}), None)
            .await;

        let logs = store.list_provider_logs("cerebras", 100).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn list_filters_by_provider() {
        let store = store().await;
        store.record_provider_log("cerebras", serde_json::json!({}), serde_json::json!({}), None).await;
        store.record_provider_log("gemini", serde_json::json!({}), serde_json::json!({}), None).await;

        let logs = store.list_provider_logs("gemini", 100).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].provider_id, "gemini");
    }
}
