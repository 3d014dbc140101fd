use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use aigateway_common::{GatewayError, RequestContext};
use aigateway_protocol::{ChatCompletionRequest, ChatCompletionResponse};
use aigateway_provider_core::{
    CredentialStore, ProviderAdapter, ProviderDescriptor, ProviderResult, ProviderTraceStore,
};

use crate::client::shared_client;
use crate::pipeline::{AuthStyle, PipelineRequest, send_and_classify};
use crate::probe::healthcheck_request;

/// Hugging Face Inference: the URL carries the model id, so the payload
/// itself omits `model`; a response without `choices` is synthesized from
/// the simpler `generated_text` shape some HF models return instead.
pub struct HuggingFaceAdapter {
    descriptor: ProviderDescriptor,
    client: wreq::Client,
    credentials: Arc<dyn CredentialStore>,
    traces: Arc<dyn ProviderTraceStore>,
}

impl HuggingFaceAdapter {
    pub fn new(
        descriptor: ProviderDescriptor,
        credentials: Arc<dyn CredentialStore>,
        traces: Arc<dyn ProviderTraceStore>,
    ) -> Self {
        Self { descriptor, client: shared_client(), credentials, traces }
    }

    fn url(&self, model_id: &str) -> String {
        let path = self.descriptor.chat_completions_path.replace("{model_id}", model_id);
        format!("{}{}", self.descriptor.base_url.trim_end_matches('/'), path)
    }

    fn build_payload(request: &ChatCompletionRequest) -> serde_json::Value {
        let mut payload = serde_json::json!({ "messages": request.messages });
        let obj = payload.as_object_mut().expect("object literal");
        if let Some(v) = request.temperature {
            obj.insert("temperature".to_string(), serde_json::json!(v));
        }
        if let Some(v) = request.top_p {
            obj.insert("top_p".to_string(), serde_json::json!(v));
        }
        if let Some(v) = request.max_tokens {
            obj.insert("max_tokens".to_string(), serde_json::json!(v));
        }
        if let Some(v) = request.stream {
            obj.insert("stream".to_string(), serde_json::json!(v));
        }
        payload
    }

    async fn call(
        &self,
        request: &ChatCompletionRequest,
        api_key: &str,
        ctx: &RequestContext,
        track_errors: bool,
    ) -> ProviderResult<serde_json::Value> {
        let payload = Self::build_payload(request);
        send_and_classify(
            &self.client,
            PipelineRequest {
                provider_id: &self.descriptor.id,
                url: self.url(&request.model),
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

/// Synthesizes a single choice from `generated_text` when the vendor didn't
/// return an OpenAI-shaped `choices` array, then fills in the common
/// defaults.
fn normalize_response(mut body: serde_json::Value, request_model: &str) -> Result<ChatCompletionResponse, GatewayError> {
    let has_choices = body.get("choices").is_some_and(|c| c.as_array().is_some_and(|a| !a.is_empty()));
    if !has_choices {
        let generated_text = body.get("generated_text").cloned().unwrap_or(serde_json::json!(""));
        let finish_reason = body.get("finish_reason").and_then(|v| v.as_str()).unwrap_or("stop").to_string();
        let choice = serde_json::json!({
            "index": 0,
            "message": {"role": "assistant", "content": generated_text},
            "finish_reason": finish_reason,
        });
        body.as_object_mut().expect("pipeline guarantees a JSON object").insert(
            "choices".to_string(),
            serde_json::json!([choice]),
        );
    }

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let obj = body.as_object_mut().expect("pipeline guarantees a JSON object");
    obj.entry("id").or_insert_with(|| serde_json::json!(format!("chatcmpl-hf-{now}")));
    obj.entry("object").or_insert_with(|| serde_json::json!("chat.completion"));
    obj.entry("created").or_insert_with(|| serde_json::json!(now));
    obj.insert("model".to_string(), serde_json::json!(request_model));

    serde_json::from_value(body)
        .map_err(|err| GatewayError::internal(format!("malformed response from huggingface: {err}")))
}

#[async_trait]
impl ProviderAdapter for HuggingFaceAdapter {
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
        normalize_response(body, &request.model)
    }

    async fn validate_api_key(&self, api_key: &str, ctx: &RequestContext) -> ProviderResult<()> {
        let model = self.descriptor.default_model().ok_or_else(|| {
            GatewayError::provider_unavailable(&self.descriptor.id, "Health check model not configured")
        })?;
        let probe = healthcheck_request(model);
        self.call(&probe, api_key, ctx, false).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_choice_from_generated_text() {
        let body = serde_json::json!({ "generated_text": "hello there" });
        let response = normalize_response(body, "llama-3").unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].finish_reason, "stop");
        assert_eq!(response.model, "llama-3");
    }

    #[test]
    fn keeps_existing_choices_array() {
        let body = serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}, "finish_reason": "length"}],
        });
        let response = normalize_response(body, "llama-3").unwrap();
        assert_eq!(response.choices[0].finish_reason, "length");
    }
}
