use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use time::OffsetDateTime;

use aigateway_common::retention_cutoff;
use aigateway_provider_core::{EventLevel, EventStore, OrchestratorEvent, RecordEventInput, StoreError, StoreResult};

use crate::entities::events;

fn backend_err<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn level_str(level: EventLevel) -> &'static str {
    match level {
        EventLevel::Info => "INFO",
        EventLevel::Warning => "WARNING",
        EventLevel::Error => "ERROR",
    }
}

fn level_from_str(level: &str) -> EventLevel {
    match level {
        "WARNING" => EventLevel::Warning,
        "ERROR" => EventLevel::Error,
        _ => EventLevel::Info,
    }
}

/// Grounded on `examples/original_source/app/telemetry/events.py`: a
/// best-effort, retention-bounded event log. Write failures never propagate
/// — every fallible step here is logged and swallowed.
pub struct SeaOrmEventStore {
    db: DatabaseConnection,
    enabled: bool,
    retention_days: i64,
}

impl SeaOrmEventStore {
    pub fn new(db: DatabaseConnection, enabled: bool, retention_days: i64) -> Self {
        Self { db, enabled, retention_days }
    }

    async fn prune(&self) -> StoreResult<()> {
        let cutoff = retention_cutoff(self.retention_days);
        events::Entity::delete_many()
            .filter(events::Column::Ts.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for SeaOrmEventStore {
    async fn record_event(&self, input: RecordEventInput) {
        if !self.enabled {
            return;
        }

        let txn = match self.db.begin().await {
            Ok(txn) => txn,
            Err(err) => {
                tracing::warn!(event = "event_store_begin_failed", error = %err);
                return;
            }
        };

        let active = events::ActiveModel {
            ts: Set(OffsetDateTime::now_utc()),
            level: Set(level_str(input.level).to_string()),
            kind: Set(input.kind),
            request_id: Set(input.request_id),
            provider_from: Set(input.provider_from),
            provider_to: Set(input.provider_to),
            model: Set(input.model),
            error_code: Set(input.error_code),
            message: Set(input.message),
            meta: Set(input.meta),
            ..Default::default()
        };

        if let Err(err) = active.insert(&txn).await {
            tracing::warn!(event = "event_store_write_failed", error = %err);
            return;
        }

        let cutoff = retention_cutoff(self.retention_days);
        if let Err(err) = events::Entity::delete_many()
            .filter(events::Column::Ts.lt(cutoff))
            .exec(&txn)
            .await
        {
            tracing::warn!(event = "event_store_prune_failed", error = %err);
            return;
        }

        if let Err(err) = txn.commit().await {
            tracing::warn!(event = "event_store_commit_failed", error = %err);
        }
    }

    async fn list_recent_events(&self, limit: usize) -> StoreResult<Vec<OrchestratorEvent>> {
        self.prune().await?;
        let cutoff = retention_cutoff(self.retention_days);
        let rows = events::Entity::find()
            .filter(events::Column::Ts.gte(cutoff))
            .order_by_desc(events::Column::Ts)
            .limit(limit.min(100) as u64)
            .all(&self.db)
            .await
            .map_err(backend_err)?;

        Ok(rows
            .into_iter()
            .map(|row| OrchestratorEvent {
                id: row.id,
                ts: row.ts,
                level: level_from_str(&row.level),
                kind: row.kind,
                request_id: row.request_id,
                provider_from: row.provider_from,
                provider_to: row.provider_to,
                model: row.model,
                error_code: row.error_code,
                message: row.message,
                meta: row.meta.unwrap_or(serde_json::Value::Null),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sync_schema;

    async fn store(retention_days: i64) -> SeaOrmEventStore {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        sync_schema(&db).await.unwrap();
        SeaOrmEventStore::new(db, true, retention_days)
    }

    #[tokio::test]
    async fn disabled_store_records_nothing() {
        let store = SeaOrmEventStore::new(
            sea_orm::Database::connect("sqlite::memory:").await.unwrap(),
            false,
            2,
        );
        sync_schema(&store.db).await.unwrap();
        store.record_event(RecordEventInput::new("provider_fail", EventLevel::Warning)).await;
        assert!(store.list_recent_events(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_then_list_round_trips_fields() {
        let store = store(2).await;
        store
            .record_event(
                RecordEventInput::new("provider_switched", EventLevel::Info)
                    .provider_from("fail")
                    .provider_to("ok")
                    .model("gpt")
                    .message("boom"),
            )
            .await;

        let events = store.list_recent_events(10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "provider_switched");
        assert_eq!(events[0].provider_from.as_deref(), Some("fail"));
        assert_eq!(events[0].provider_to.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn retention_prunes_rows_older_than_cutoff() {
        let store = store(2).await;
        let stale = events::ActiveModel {
            ts: Set(OffsetDateTime::now_utc() - time::Duration::days(5)),
            level: Set("INFO".to_string()),
            kind: Set("provider_switched".to_string()),
            ..Default::default()
        };
        stale.insert(&store.db).await.unwrap();

        store.record_event(RecordEventInput::new("request_error", EventLevel::Error)).await;

        let events = store.list_recent_events(10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "request_error");
    }

    #[tokio::test]
    async fn list_clamps_to_one_hundred() {
        let store = store(2).await;
        for _ in 0..5 {
            store.record_event(RecordEventInput::new("provider_fail", EventLevel::Warning)).await;
        }
        let events = store.list_recent_events(1000).await.unwrap();
        assert!(events.len() <= 100);
    }
}
