use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;

use aigateway_common::{GatewayError, RequestContext};
use aigateway_protocol::{ChatCompletionRequest, ChatCompletionResponse, MessageContent};
use aigateway_provider_core::{
    CredentialStore, ProviderAdapter, ProviderDescriptor, ProviderResult, ProviderTraceStore,
};

use crate::client::shared_client;
use crate::pipeline::{self, AuthStyle, PipelineRequest, send_and_classify};
use crate::probe::healthcheck_request;

/// Gemini `generateContent`. The only adapter using `x-goog-api-key` auth
/// and a `{model}`-templated path; also the only one
/// that enriches its rate-limit message from the vendor's error body.
pub struct GeminiAdapter {
    descriptor: ProviderDescriptor,
    client: wreq::Client,
    credentials: Arc<dyn CredentialStore>,
    traces: Arc<dyn ProviderTraceStore>,
}

impl GeminiAdapter {
    pub fn new(
        descriptor: ProviderDescriptor,
        credentials: Arc<dyn CredentialStore>,
        traces: Arc<dyn ProviderTraceStore>,
    ) -> Self {
        Self { descriptor, client: shared_client(), credentials, traces }
    }

    /// The `models/` prefix is stripped before substitution into
    /// `chat_completions_path`'s `{model}` placeholder.
    fn url(&self, model: &str) -> String {
        let stripped = model.strip_prefix("models/").unwrap_or(model);
        let path = self.descriptor.chat_completions_path.replace("{model}", stripped);
        format!("{}{}", self.descriptor.base_url.trim_end_matches('/'), path)
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
                url: self.url(&request.model),
                payload,
                api_key,
                auth_style: AuthStyle::GoogApiKey,
                request_id: Some(ctx.request_id.as_str()),
                track_errors,
            },
            self.credentials.as_ref(),
            self.traces.as_ref(),
            |body| pipeline::collapse_error_detail(body, 300),
        )
        .await
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
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
        let model = self.descriptor.default_model().unwrap_or_default();
        let probe = healthcheck_request(model);
        self.call(&probe, api_key, ctx, false).await?;
        Ok(())
    }
}

fn build_payload(request: &ChatCompletionRequest) -> Value {
    let mut contents: Vec<Value> = Vec::new();
    let mut system_parts: Vec<Value> = Vec::new();

    for message in &request.messages {
        let text = extract_text(message.content.as_ref());
        if text.is_empty() {
            continue;
        }
        match message.role.as_str() {
            "system" => system_parts.push(serde_json::json!({"text": text})),
            "assistant" => contents.push(serde_json::json!({"role": "model", "parts": [{"text": text}]})),
            _ => contents.push(serde_json::json!({"role": "user", "parts": [{"text": text}]})),
        }
    }

    let mut payload = serde_json::Map::new();
    if !contents.is_empty() {
        payload.insert("contents".to_string(), Value::Array(contents));
    }
    if !system_parts.is_empty() {
        payload.insert("systemInstruction".to_string(), serde_json::json!({"parts": system_parts}));
    }

    let mut generation_config = serde_json::Map::new();
    if let Some(v) = request.temperature {
        generation_config.insert("temperature".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.max_tokens {
        generation_config.insert("maxOutputTokens".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.top_p {
        generation_config.insert("topP".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.frequency_penalty {
        generation_config.insert("frequencyPenalty".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.presence_penalty {
        generation_config.insert("presencePenalty".to_string(), serde_json::json!(v));
    }
    if !generation_config.is_empty() {
        payload.insert("generationConfig".to_string(), Value::Object(generation_config));
    }

    Value::Object(payload)
}

/// Depth-1 text extraction: a string passes through; a part list
/// extracts each part's `text` or `content` field (or the part itself if
/// it's a bare string); anything else contributes nothing.
fn extract_text(content: Option<&MessageContent>) -> String {
    match content {
        None => String::new(),
        Some(MessageContent::Text(text)) => text.clone(),
        Some(MessageContent::Parts(parts)) => parts
            .iter()
            .filter_map(|item| {
                item.get("text")
                    .and_then(|v| v.as_str())
                    .or_else(|| item.get("content").and_then(|v| v.as_str()))
                    .or_else(|| item.as_str())
                    .map(str::to_string)
            })
            .collect(),
    }
}

fn normalize_response(data: Value, request_model: &str) -> Result<ChatCompletionResponse, GatewayError> {
    let candidate =
        data.get("candidates").and_then(|v| v.as_array()).and_then(|arr| arr.iter().find(|c| c.is_object()));

    let mut text = String::new();
    let mut finish_reason = "stop".to_string();
    let mut metadata = serde_json::Map::new();

    if let Some(candidate) = candidate {
        if let Some(parts) = candidate.get("content").and_then(|c| c.get("parts")).and_then(|p| p.as_array()) {
            for part in parts {
                if let Some(t) = part.get("text").and_then(|v| v.as_str()) {
                    text.push_str(t);
                }
            }
        }
        if let Some(fr) = candidate.get("finishReason").and_then(|v| v.as_str()) {
            finish_reason = fr.to_string();
        }
        if let Some(safety) = candidate.get("safetyRatings")
            && safety.as_array().is_some_and(|a| !a.is_empty())
        {
            metadata.insert("safetyRatings".to_string(), safety.clone());
        }
        if let Some(citations) = candidate.get("citationMetadata").and_then(|cm| cm.get("citations"))
            && citations.as_array().is_some_and(|a| !a.is_empty())
        {
            metadata.insert("gemini".to_string(), serde_json::json!({"citations": citations}));
        }
    }

    let message = aigateway_protocol::ResponseMessage {
        role: "assistant".to_string(),
        content: MessageContent::Text(text),
        tool_calls: None,
        metadata: if metadata.is_empty() { None } else { Some(Value::Object(metadata)) },
    };

    let choice = aigateway_protocol::Choice { index: 0, message, finish_reason: finish_reason.to_lowercase() };

    let now = OffsetDateTime::now_utc();
    let id = data
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("chatcmpl-gemini-{}", now.unix_timestamp_nanos() / 1_000_000));
    let object = data.get("object").and_then(|v| v.as_str()).unwrap_or("chat.completion").to_string();
    let created = data.get("created").and_then(|v| v.as_i64()).unwrap_or_else(|| now.unix_timestamp());
    let usage = normalize_usage(data.get("usageMetadata"));

    Ok(ChatCompletionResponse { id, object, created, model: request_model.to_string(), choices: vec![choice], usage })
}

fn normalize_usage(usage: Option<&Value>) -> Option<aigateway_protocol::Usage> {
    let usage = usage?;
    let prompt = usage.get("promptTokenCount").and_then(|v| v.as_i64());
    let completion = usage.get("candidatesTokenCount").and_then(|v| v.as_i64());
    let mut total = usage.get("totalTokenCount").and_then(|v| v.as_i64());
    if total.is_none()
        && let (Some(p), Some(c)) = (prompt, completion)
    {
        total = Some(p + c);
    }
    let result = aigateway_protocol::Usage { prompt_tokens: prompt, completion_tokens: completion, total_tokens: total };
    if result.is_empty() { None } else { Some(result) }
}
