use async_trait::async_trait;

use crate::credential::ProviderCredential;
use crate::store_error::StoreResult;
use crate::telemetry::{OrchestratorEvent, ProviderLog, RecordEventInput};

/// All operations are single-row transactions; writers serialize on
/// `provider_id` at the persistence layer. Reads may be stale relative to
/// in-flight writes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn upsert(&self, provider_id: &str, api_key: &str) -> StoreResult<()>;
    async fn get(&self, provider_id: &str) -> StoreResult<Option<String>>;
    async fn list(&self) -> StoreResult<Vec<ProviderCredential>>;
    async fn record_error(&self, provider_id: &str, code: &str) -> StoreResult<()>;
    async fn clear_error(&self, provider_id: &str) -> StoreResult<()>;
    async fn delete(&self, provider_id: &str) -> StoreResult<bool>;
}

/// `record_event` never returns an error: persistence failures are
/// swallowed and logged by the implementation — they must never propagate
/// into the request's critical path.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn record_event(&self, input: RecordEventInput);
    async fn list_recent_events(&self, limit: usize) -> StoreResult<Vec<OrchestratorEvent>>;
}

/// `record_provider_log` never returns an error, for the same reason.
#[async_trait]
pub trait ProviderTraceStore: Send + Sync {
    async fn record_provider_log(
        &self,
        provider_id: &str,
        request_body: serde_json::Value,
        response_body: serde_json::Value,
        request_id: Option<&str>,
    );
    async fn list_provider_logs(&self, provider_id: &str, limit: usize) -> StoreResult<Vec<ProviderLog>>;
}
