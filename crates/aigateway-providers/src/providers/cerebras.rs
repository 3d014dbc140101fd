use std::sync::Arc;

use async_trait::async_trait;

use aigateway_common::{GatewayError, RequestContext};
use aigateway_protocol::{ChatCompletionRequest, ChatCompletionResponse};
use aigateway_provider_core::{
    CredentialStore, ProviderAdapter, ProviderDescriptor, ProviderResult, ProviderTraceStore,
};

use crate::client::shared_client;
use crate::openai_shape::{build_payload, decode_response};
use crate::pipeline::{AuthStyle, PipelineRequest, send_and_classify};
use crate::probe::healthcheck_request;

/// Speaks the OpenAI chat-completions shape natively; OpenRouter is the
/// same shape under a different base URL, see `openrouter.rs`.
pub struct CerebrasAdapter {
    descriptor: ProviderDescriptor,
    client: wreq::Client,
    credentials: Arc<dyn CredentialStore>,
    traces: Arc<dyn ProviderTraceStore>,
}

impl CerebrasAdapter {
    pub fn new(
        descriptor: ProviderDescriptor,
        credentials: Arc<dyn CredentialStore>,
        traces: Arc<dyn ProviderTraceStore>,
    ) -> Self {
        Self { descriptor, client: shared_client(), credentials, traces }
    }

    fn url(&self) -> String {
        format!("{}{}", self.descriptor.base_url.trim_end_matches('/'), self.descriptor.chat_completions_path)
    }

    async fn call(
        &self,
        request: &ChatCompletionRequest,
        api_key: &str,
        ctx: &RequestContext,
        track_errors: bool,
    ) -> ProviderResult<serde_json::Value> {
        let payload = build_payload(request);
        send_and_classify(
            &self.client,
            PipelineRequest {
                provider_id: &self.descriptor.id,
                url: self.url(),
                payload,
                api_key,
                auth_style: AuthStyle::Bearer,
                request_id: Some(ctx.request_id.as_str()),
                track_errors,
            },
            self.credentials.as_ref(),
            self.traces.as_ref(),
            |_| None,
        )
        .await
    }
}

#[async_trait]
impl ProviderAdapter for CerebrasAdapter {
    fn provider_id(&self) -> &str {
        &self.descriptor.id
    }

    async fn chat_completions(
        &self,
        request: ChatCompletionRequest,
        ctx: &RequestContext,
    ) -> ProviderResult<ChatCompletionResponse> {
        let api_key = self
            .credentials
            .get(&self.descriptor.id)
            .await
            .map_err(|err| GatewayError::internal(err.to_string()))?;
        let api_key = match api_key {
            Some(key) if !key.is_empty() => key,
            _ => return Err(GatewayError::auth_missing(&self.descriptor.id)),
        };
        let body = self.call(&request, &api_key, ctx, true).await?;
        decode_response(body, &self.descriptor.id, &request.model)
    }

    async fn validate_api_key(&self, api_key: &str, ctx: &RequestContext) -> ProviderResult<()> {
        let model = self.descriptor.default_model().unwrap_or_default();
        let probe = healthcheck_request(model);
        self.call(&probe, api_key, ctx, false).await?;
        Ok(())
    }
}
