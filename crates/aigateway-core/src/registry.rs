use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use aigateway_common::GatewayError;
use aigateway_provider_core::{
    AppConfig, CredentialStore, ProviderAdapter, ProviderDescriptor, ProviderResult, ProviderState,
    ProviderTraceStore,
};
use aigateway_providers::{CerebrasAdapter, CohereAdapter, GeminiAdapter, HuggingFaceAdapter, OpenRouterAdapter};

/// What the Selector needs from a provider catalog: the priority-sorted
/// list, lookup by id, and adapter construction. Split out from
/// `ProviderRegistry` so the Selector's failover loop can be exercised
/// against a canned catalog in tests without real vendor HTTP calls.
#[async_trait]
pub trait ProviderSource: Send + Sync {
    fn providers(&self) -> Vec<ProviderDescriptor>;
    fn find_descriptor(&self, provider_id: &str) -> Option<ProviderDescriptor>;
    async fn get_adapter(&self, provider_id: &str) -> ProviderResult<Arc<dyn ProviderAdapter>>;
}

/// Holds the configured providers and a static `id → adapter` table; adapter
/// instances are constructed on first use and cached for the life of the
/// registry.
pub struct ProviderRegistry {
    config: AppConfig,
    credentials: Arc<dyn CredentialStore>,
    traces: Arc<dyn ProviderTraceStore>,
    adapters: Mutex<HashMap<String, Arc<dyn ProviderAdapter>>>,
}

impl ProviderRegistry {
    pub fn new(config: AppConfig, credentials: Arc<dyn CredentialStore>, traces: Arc<dyn ProviderTraceStore>) -> Self {
        Self { config, credentials, traces, adapters: Mutex::new(HashMap::new()) }
    }

    /// Configured providers sorted ascending by priority, ties in config order.
    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        self.config.providers_by_priority().into_iter().cloned().collect()
    }

    pub fn find_descriptor(&self, provider_id: &str) -> Option<ProviderDescriptor> {
        self.config.providers.iter().find(|p| p.id == provider_id).cloned()
    }

    /// Returns the memoized adapter instance for `provider_id`, constructing
    /// and caching one on first use. Fails `config_error` if no provider
    /// with that id is configured, `provider_unavailable` if one is
    /// configured but no adapter class is registered for its id.
    pub async fn get_adapter(&self, provider_id: &str) -> ProviderResult<Arc<dyn ProviderAdapter>> {
        {
            let cache = self.adapters.lock().await;
            if let Some(adapter) = cache.get(provider_id) {
                return Ok(adapter.clone());
            }
        }

        let descriptor = self
            .find_descriptor(provider_id)
            .ok_or_else(|| GatewayError::config_error(format!("no provider configured with id {provider_id}")))?;
        let adapter = construct_adapter(descriptor, self.credentials.clone(), self.traces.clone())
            .ok_or_else(|| GatewayError::provider_unavailable(provider_id, "No adapter configured"))?;

        let mut cache = self.adapters.lock().await;
        Ok(cache.entry(provider_id.to_string()).or_insert(adapter).clone())
    }

    /// Joins live configuration with a snapshot of credential rows, used
    /// by the admin dashboard.
    pub async fn get_states(&self) -> Vec<ProviderState> {
        let rows = self.credentials.list().await.unwrap_or_default();
        self.config
            .providers_by_priority()
            .into_iter()
            .map(|descriptor| {
                let credential = rows.iter().find(|c| c.provider_id == descriptor.id).cloned();
                ProviderState { provider: descriptor.clone(), credential }
            })
            .collect()
    }
}

#[async_trait]
impl ProviderSource for ProviderRegistry {
    fn providers(&self) -> Vec<ProviderDescriptor> {
        ProviderRegistry::providers(self)
    }

    fn find_descriptor(&self, provider_id: &str) -> Option<ProviderDescriptor> {
        ProviderRegistry::find_descriptor(self, provider_id)
    }

    async fn get_adapter(&self, provider_id: &str) -> ProviderResult<Arc<dyn ProviderAdapter>> {
        ProviderRegistry::get_adapter(self, provider_id).await
    }
}

fn construct_adapter(
    descriptor: ProviderDescriptor,
    credentials: Arc<dyn CredentialStore>,
    traces: Arc<dyn ProviderTraceStore>,
) -> Option<Arc<dyn ProviderAdapter>> {
    match descriptor.id.as_str() {
        "cerebras" => Some(Arc::new(CerebrasAdapter::new(descriptor, credentials, traces))),
        "openrouter" => Some(Arc::new(OpenRouterAdapter::new(descriptor, credentials, traces))),
        "cohere" => Some(Arc::new(CohereAdapter::new(descriptor, credentials, traces))),
        "gemini" => Some(Arc::new(GeminiAdapter::new(descriptor, credentials, traces))),
        "huggingface" => Some(Arc::new(HuggingFaceAdapter::new(descriptor, credentials, traces))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap as StdHashMap;

    struct EmptyCredentials;
    #[async_trait]
    impl CredentialStore for EmptyCredentials {
        async fn upsert(&self, _: &str, _: &str) -> aigateway_provider_core::StoreResult<()> {
            Ok(())
        }
        async fn get(&self, _: &str) -> aigateway_provider_core::StoreResult<Option<String>> {
            Ok(None)
        }
        async fn list(&self) -> aigateway_provider_core::StoreResult<Vec<aigateway_provider_core::ProviderCredential>> {
            Ok(vec![])
        }
        async fn record_error(&self, _: &str, _: &str) -> aigateway_provider_core::StoreResult<()> {
            Ok(())
        }
        async fn clear_error(&self, _: &str) -> aigateway_provider_core::StoreResult<()> {
            Ok(())
        }
        async fn delete(&self, _: &str) -> aigateway_provider_core::StoreResult<bool> {
            Ok(false)
        }
    }

    struct EmptyTraces;
    #[async_trait]
    impl ProviderTraceStore for EmptyTraces {
        async fn record_provider_log(&self, _: &str, _: serde_json::Value, _: serde_json::Value, _: Option<&str>) {}
        async fn list_provider_logs(
            &self,
            _: &str,
            _: usize,
        ) -> aigateway_provider_core::StoreResult<Vec<aigateway_provider_core::ProviderLog>> {
            Ok(vec![])
        }
    }

    fn descriptor(id: &str, priority: i32) -> ProviderDescriptor {
        ProviderDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            priority,
            base_url: "https://example.com".to_string(),
            chat_completions_path: "/v1/chat/completions".to_string(),
            models: StdHashMap::new(),
            availability: serde_json::Value::Null,
            credentials: serde_json::Value::Null,
        }
    }

    fn registry(providers: Vec<ProviderDescriptor>) -> ProviderRegistry {
        let config = AppConfig { providers, events_enabled: false, retention_days: 2 };
        ProviderRegistry::new(config, Arc::new(EmptyCredentials), Arc::new(EmptyTraces))
    }

    #[tokio::test]
    async fn unknown_provider_id_is_config_error() {
        let registry = registry(vec![descriptor("cerebras", 10)]);
        let err = registry.get_adapter("nope").await.unwrap_err();
        assert_eq!(err.kind(), aigateway_common::GatewayErrorKind::ConfigError);
    }

    #[tokio::test]
    async fn configured_but_unregistered_adapter_is_provider_unavailable() {
        let registry = registry(vec![descriptor("carrier-pigeon", 10)]);
        let err = registry.get_adapter("carrier-pigeon").await.unwrap_err();
        assert_eq!(err.kind(), aigateway_common::GatewayErrorKind::ProviderUnavailable);
    }

    #[tokio::test]
    async fn get_adapter_is_memoized() {
        let registry = registry(vec![descriptor("cerebras", 10)]);
        let first = registry.get_adapter("cerebras").await.unwrap();
        let second = registry.get_adapter("cerebras").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn providers_sorted_by_priority() {
        let registry = registry(vec![descriptor("b", 20), descriptor("a", 10)]);
        let ids: Vec<String> = registry.providers().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
