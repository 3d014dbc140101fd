use std::sync::Arc;

use aigateway_common::{GatewayError, RequestContext};
use aigateway_protocol::{ChatCompletionRequest, ChatCompletionResponse};
use aigateway_provider_core::{EventLevel, EventStore, ProviderResult, RecordEventInput};

use crate::registry::ProviderSource;

/// Drives the priority-ordered failover loop: at most one upstream call in
/// flight per request, no retries against the same provider, the terminal
/// error surfaced is the last one observed.
pub struct Selector {
    registry: Arc<dyn ProviderSource>,
    events: Arc<dyn EventStore>,
}

struct FailedAttempt {
    provider_id: String,
    message: String,
    model: String,
}

impl Selector {
    pub fn new(registry: Arc<dyn ProviderSource>, events: Arc<dyn EventStore>) -> Self {
        Self { registry, events }
    }

    pub async fn chat_completions(
        &self,
        request: ChatCompletionRequest,
        ctx: &RequestContext,
    ) -> ProviderResult<ChatCompletionResponse> {
        let candidates = match &ctx.provider_override {
            Some(provider_id) => vec![self.registry.find_descriptor(provider_id).ok_or_else(|| {
                GatewayError::config_error(format!("unknown provider override {provider_id}"))
            })?],
            None => self.registry.providers(),
        };

        let mut prev_failed: Option<FailedAttempt> = None;
        let mut final_err: Option<(GatewayError, String)> = None;

        for (index, provider) in candidates.iter().enumerate() {
            let attempt = index + 1;

            if let Some(failed) = prev_failed.take() {
                self.events
                    .record_event(
                        RecordEventInput::new("provider_switched", EventLevel::Info)
                            .provider_from(failed.provider_id)
                            .provider_to(provider.id.clone())
                            .model(failed.model)
                            .message(failed.message)
                            .request_id(ctx.request_id.clone())
                            .meta(serde_json::json!({"attempt": attempt})),
                    )
                    .await;
            }

            let effective_model = if !request.model.is_empty() {
                request.model.clone()
            } else {
                match provider.default_model() {
                    Some(model) => model.to_string(),
                    None => return Err(GatewayError::config_error("No default model configured")),
                }
            };

            let call_request =
                if effective_model == request.model { request.clone() } else { request.with_model(&effective_model) };

            let adapter = self.registry.get_adapter(&provider.id).await?;
            match adapter.chat_completions(call_request, ctx).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    self.events
                        .record_event(
                            RecordEventInput::new("provider_fail", EventLevel::Warning)
                                .provider_from(provider.id.clone())
                                .model(effective_model.clone())
                                .message(err.message())
                                .request_id(ctx.request_id.clone())
                                .meta(serde_json::json!({"attempt": attempt})),
                        )
                        .await;
                    prev_failed = Some(FailedAttempt {
                        provider_id: provider.id.clone(),
                        message: err.message(),
                        model: effective_model.clone(),
                    });
                    final_err = Some((err, effective_model));
                }
            }
        }

        if let Some((err, model)) = final_err {
            self.events
                .record_event(
                    RecordEventInput::new("request_error", EventLevel::Error)
                        .provider_from(err.provider_id().unwrap_or("unknown"))
                        .model(model)
                        .message(err.message())
                        .request_id(ctx.request_id.clone()),
                )
                .await;
            return Err(err);
        }

        Err(GatewayError::provider_unavailable("unknown", "No providers configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use aigateway_protocol::{Message, MessageContent};
    use aigateway_provider_core::{
        AppConfig, CredentialStore, OrchestratorEvent, ProviderAdapter, ProviderCredential, ProviderDescriptor,
        ProviderLog, ProviderTraceStore, StoreResult,
    };
    use crate::registry::ProviderRegistry;

    struct NoopCredentials;
    #[async_trait]
    impl CredentialStore for NoopCredentials {
        async fn upsert(&self, _: &str, _: &str) -> StoreResult<()> {
            Ok(())
        }
        async fn get(&self, _: &str) -> StoreResult<Option<String>> {
            Ok(Some("sk-test".to_string()))
        }
        async fn list(&self) -> StoreResult<Vec<ProviderCredential>> {
            Ok(vec![])
        }
        async fn record_error(&self, _: &str, _: &str) -> StoreResult<()> {
            Ok(())
        }
        async fn clear_error(&self, _: &str) -> StoreResult<()> {
            Ok(())
        }
        async fn delete(&self, _: &str) -> StoreResult<bool> {
            Ok(false)
        }
    }

    struct NoopTraces;
    #[async_trait]
    impl ProviderTraceStore for NoopTraces {
        async fn record_provider_log(&self, _: &str, _: serde_json::Value, _: serde_json::Value, _: Option<&str>) {}
        async fn list_provider_logs(&self, _: &str, _: usize) -> StoreResult<Vec<ProviderLog>> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct RecordingEvents {
        kinds: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl EventStore for RecordingEvents {
        async fn record_event(&self, input: RecordEventInput) {
            self.kinds.lock().unwrap().push(input.kind);
        }
        async fn list_recent_events(&self, _: usize) -> StoreResult<Vec<OrchestratorEvent>> {
            Ok(vec![])
        }
    }

    struct CannedAdapter {
        id: String,
        fails: bool,
    }

    #[async_trait]
    impl ProviderAdapter for CannedAdapter {
        fn provider_id(&self) -> &str {
            &self.id
        }

        async fn chat_completions(
            &self,
            request: ChatCompletionRequest,
            _ctx: &RequestContext,
        ) -> ProviderResult<ChatCompletionResponse> {
            if self.fails {
                return Err(GatewayError::provider_unavailable(&self.id, "boom"));
            }
            Ok(ChatCompletionResponse {
                id: "id".to_string(),
                object: "chat.completion".to_string(),
                created: 0,
                model: request.model,
                choices: vec![],
                usage: None,
            })
        }

        async fn validate_api_key(&self, _api_key: &str, _ctx: &RequestContext) -> ProviderResult<()> {
            Ok(())
        }
    }

    fn descriptor(id: &str, priority: i32, default_model: Option<&str>) -> ProviderDescriptor {
        let mut models = HashMap::new();
        if let Some(model) = default_model {
            models.insert("default".to_string(), model.to_string());
        }
        ProviderDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            priority,
            base_url: "https://example.com".to_string(),
            chat_completions_path: "/v1/chat/completions".to_string(),
            models,
            availability: serde_json::Value::Null,
            credentials: serde_json::Value::Null,
        }
    }

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: String::new(),
            messages: vec![Message {
                role: "user".to_string(),
                content: Some(MessageContent::Text("hi".to_string())),
                extra: Default::default(),
            }],
            ..Default::default()
        }
    }

    /// A canned catalog for the failover tests: maps provider ids directly
    /// to canned adapters without needing real vendor ids or network access.
    struct FakeCatalog {
        descriptors: Vec<ProviderDescriptor>,
        adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    }

    #[async_trait]
    impl ProviderSource for FakeCatalog {
        fn providers(&self) -> Vec<ProviderDescriptor> {
            let mut sorted = self.descriptors.clone();
            sorted.sort_by_key(|d| d.priority);
            sorted
        }

        fn find_descriptor(&self, provider_id: &str) -> Option<ProviderDescriptor> {
            self.descriptors.iter().find(|d| d.id == provider_id).cloned()
        }

        async fn get_adapter(&self, provider_id: &str) -> ProviderResult<Arc<dyn ProviderAdapter>> {
            self.adapters
                .get(provider_id)
                .cloned()
                .ok_or_else(|| GatewayError::provider_unavailable(provider_id, "No adapter configured"))
        }
    }

    #[tokio::test]
    async fn failover_tries_next_candidate_and_emits_expected_events() {
        let catalog = FakeCatalog {
            descriptors: vec![descriptor("fail", 10, Some("m")), descriptor("ok", 20, Some("m"))],
            adapters: HashMap::from([
                ("fail".to_string(), Arc::new(CannedAdapter { id: "fail".to_string(), fails: true }) as Arc<dyn ProviderAdapter>),
                ("ok".to_string(), Arc::new(CannedAdapter { id: "ok".to_string(), fails: false }) as Arc<dyn ProviderAdapter>),
            ]),
        };
        let events = Arc::new(RecordingEvents::default());
        let selector = Selector::new(Arc::new(catalog), events.clone());
        let ctx = RequestContext::new(None, None);
        let response = selector.chat_completions(request(), &ctx).await.unwrap();
        assert_eq!(response.model, "m");

        let kinds = events.kinds.lock().unwrap().clone();
        assert_eq!(kinds, vec!["provider_fail", "provider_switched"]);
    }

    #[tokio::test]
    async fn all_providers_exhausted_emits_single_request_error() {
        let catalog = FakeCatalog {
            descriptors: vec![descriptor("fail", 10, Some("m")), descriptor("also-fail", 20, Some("m"))],
            adapters: HashMap::from([
                ("fail".to_string(), Arc::new(CannedAdapter { id: "fail".to_string(), fails: true }) as Arc<dyn ProviderAdapter>),
                (
                    "also-fail".to_string(),
                    Arc::new(CannedAdapter { id: "also-fail".to_string(), fails: true }) as Arc<dyn ProviderAdapter>,
                ),
            ]),
        };
        let events = Arc::new(RecordingEvents::default());
        let selector = Selector::new(Arc::new(catalog), events.clone());
        let ctx = RequestContext::new(None, None);
        let err = selector.chat_completions(request(), &ctx).await.unwrap_err();
        assert_eq!(err.provider_id(), Some("also-fail"));

        let kinds = events.kinds.lock().unwrap().clone();
        assert_eq!(kinds, vec!["provider_fail", "provider_switched", "provider_fail", "request_error"]);
    }

    #[tokio::test]
    async fn default_model_is_resolved_when_request_model_is_empty() {
        let catalog = FakeCatalog {
            descriptors: vec![descriptor("ok", 10, Some("ok-default"))],
            adapters: HashMap::from([(
                "ok".to_string(),
                Arc::new(CannedAdapter { id: "ok".to_string(), fails: false }) as Arc<dyn ProviderAdapter>,
            )]),
        };
        let events = Arc::new(RecordingEvents::default());
        let selector = Selector::new(Arc::new(catalog), events);
        let ctx = RequestContext::new(None, None);
        let response = selector.chat_completions(request(), &ctx).await.unwrap();
        assert_eq!(response.model, "ok-default");
    }

    #[tokio::test]
    async fn provider_override_restricts_candidates_to_one() {
        let config = AppConfig {
            providers: vec![descriptor("cerebras", 10, Some("m"))],
            events_enabled: true,
            retention_days: 2,
        };
        let registry = Arc::new(ProviderRegistry::new(config, Arc::new(NoopCredentials), Arc::new(NoopTraces)));
        let events = Arc::new(RecordingEvents::default());
        let selector = Selector::new(registry, events);
        let ctx = RequestContext::new(None, Some("missing-provider".to_string()));
        let err = selector.chat_completions(request(), &ctx).await.unwrap_err();
        assert_eq!(err.kind(), aigateway_common::GatewayErrorKind::ConfigError);
    }

    #[tokio::test]
    async fn empty_candidate_list_is_provider_unavailable_unknown() {
        let config = AppConfig { providers: vec![], events_enabled: true, retention_days: 2 };
        let registry = Arc::new(ProviderRegistry::new(config, Arc::new(NoopCredentials), Arc::new(NoopTraces)));
        let events = Arc::new(RecordingEvents::default());
        let selector = Selector::new(registry, events);
        let ctx = RequestContext::new(None, None);
        let err = selector.chat_completions(request(), &ctx).await.unwrap_err();
        assert_eq!(err.kind(), aigateway_common::GatewayErrorKind::ProviderUnavailable);
        assert_eq!(err.provider_id(), Some("unknown"));
    }

    #[tokio::test]
    async fn missing_default_model_is_config_error() {
        let config = AppConfig { providers: vec![descriptor("cerebras", 10, None)], events_enabled: true, retention_days: 2 };
        let registry = Arc::new(ProviderRegistry::new(config, Arc::new(NoopCredentials), Arc::new(NoopTraces)));
        let events = Arc::new(RecordingEvents::default());
        let selector = Selector::new(registry, events);
        let ctx = RequestContext::new(None, None);
        let err = selector.chat_completions(request(), &ctx).await.unwrap_err();
        assert_eq!(err.kind(), aigateway_common::GatewayErrorKind::ConfigError);
    }
}
