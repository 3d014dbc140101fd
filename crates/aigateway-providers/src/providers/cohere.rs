use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;

use aigateway_common::{GatewayError, RequestContext};
use aigateway_protocol::{ChatCompletionRequest, ChatCompletionResponse, Message, MessageContent};
use aigateway_provider_core::{
    CredentialStore, ProviderAdapter, ProviderDescriptor, ProviderResult, ProviderTraceStore,
};

use crate::client::shared_client;
use crate::pipeline::{AuthStyle, PipelineRequest, send_and_classify};
use crate::probe::healthcheck_request;

/// Cohere v2 chat. Content is multi-part on both sides of the translation:
/// the OpenAI-shaped duck-typed parts become Cohere's `{type, ...}` parts on
/// the way out, and Cohere's tagged content sequence is walked back into
/// OpenAI shape on the way in.
pub struct CohereAdapter {
    descriptor: ProviderDescriptor,
    client: wreq::Client,
    credentials: Arc<dyn CredentialStore>,
    traces: Arc<dyn ProviderTraceStore>,
}

impl CohereAdapter {
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
impl ProviderAdapter for CohereAdapter {
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

/// Only `temperature, max_tokens, top_p, stream` are forwarded as scalars;
/// `messages` is rewritten into Cohere's ordered content parts.
fn build_payload(request: &ChatCompletionRequest) -> Value {
    let messages: Vec<Value> = request.messages.iter().map(message_to_cohere).collect();
    let mut payload = serde_json::json!({
        "model": request.model,
        "messages": messages,
    });
    let obj = payload.as_object_mut().expect("object literal");
    if let Some(v) = request.temperature {
        obj.insert("temperature".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.max_tokens {
        obj.insert("max_tokens".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.top_p {
        obj.insert("top_p".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.stream {
        obj.insert("stream".to_string(), serde_json::json!(v));
    }
    payload
}

fn message_to_cohere(message: &Message) -> Value {
    let parts = match &message.content {
        Some(content) => content_to_parts(content),
        None => Vec::new(),
    };
    serde_json::json!({ "role": message.role, "content": parts })
}

fn content_to_parts(content: &MessageContent) -> Vec<Value> {
    match content {
        MessageContent::Text(text) => vec![serde_json::json!({"type": "text", "text": text})],
        MessageContent::Parts(parts) => parts.iter().map(map_request_part).collect(),
    }
}

fn map_request_part(part: &Value) -> Value {
    let kind = part.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match kind {
        "text" | "input_text" => {
            let text = part.get("text").and_then(|v| v.as_str()).unwrap_or("");
            serde_json::json!({"type": "text", "text": text})
        }
        "image" | "image_url" | "input_image" => {
            serde_json::json!({"type": "image", "source": resolve_request_image_source(part)})
        }
        _ => {
            let text = part
                .get("text")
                .and_then(|v| v.as_str())
                .or_else(|| part.get("content").and_then(|v| v.as_str()))
                .unwrap_or("");
            serde_json::json!({"type": "text", "text": text})
        }
    }
}

/// Resolves an image part's `source`: an explicit `source` dict passes
/// through verbatim; otherwise the nested `image`/`image_url` field
/// is inspected for base64 or URL data, with `data:` URLs decoded into
/// base64 sources rather than left as URLs.
fn resolve_request_image_source(part: &Value) -> Value {
    if let Some(source) = part.get("source") {
        return source.clone();
    }

    let image_field = part.get("image").or_else(|| part.get("image_url"));
    let (b64, url, media_type) = match image_field {
        Some(Value::Object(map)) => (
            map.get("b64_json").or_else(|| map.get("base64")).and_then(|v| v.as_str()),
            map.get("url").and_then(|v| v.as_str()),
            map.get("media_type").and_then(|v| v.as_str()),
        ),
        Some(Value::String(s)) => (None, Some(s.as_str()), None),
        _ => (None, None, None),
    };

    if let Some(b64) = b64 {
        return serde_json::json!({
            "type": "base64",
            "media_type": media_type.unwrap_or("image/png"),
            "data": b64,
        });
    }

    if let Some(url) = url {
        if let Some(rest) = url.strip_prefix("data:")
            && let Some((meta, data)) = rest.split_once(',')
        {
            let media_type = meta.strip_suffix(";base64").unwrap_or(meta);
            return serde_json::json!({"type": "base64", "media_type": media_type, "data": data});
        }
        let mut obj = serde_json::Map::new();
        obj.insert("type".to_string(), serde_json::json!("url"));
        obj.insert("url".to_string(), serde_json::json!(url));
        if let Some(media_type) = media_type {
            obj.insert("media_type".to_string(), serde_json::json!(media_type));
        }
        return Value::Object(obj);
    }

    serde_json::json!({})
}

fn normalize_response(data: Value, request_model: &str) -> Result<ChatCompletionResponse, GatewayError> {
    let empty_message = serde_json::json!({});
    let message = data.get("message").unwrap_or(&empty_message);
    let content_items = message.get("content").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    let mut ordered_content: Vec<Value> = Vec::new();
    let mut tool_calls: Vec<Value> = Vec::new();
    let mut citations: Vec<Value> = Vec::new();
    let mut has_non_text = false;

    for item in &content_items {
        match item.get("type").and_then(|v| v.as_str()).unwrap_or("") {
            "text" => {
                let text = item.get("text").and_then(|v| v.as_str()).unwrap_or("");
                ordered_content.push(serde_json::json!({"type": "text", "text": text}));
            }
            "tool_calls" => {
                for tool in item.get("tool_calls").and_then(|v| v.as_array()).into_iter().flatten() {
                    if let Some(normalized) = normalize_tool_call(tool) {
                        tool_calls.push(normalized);
                    }
                }
            }
            "citation" => {
                if let Some(more) = item.get("citations").and_then(|v| v.as_array()) {
                    citations.extend(more.iter().cloned());
                }
            }
            "image" => {
                let image_url = resolve_response_image_url(item.get("source"));
                ordered_content.push(serde_json::json!({"type": "image_url", "image_url": image_url}));
                has_non_text = true;
            }
            _ => {
                if let Some(text) =
                    item.get("text").and_then(|v| v.as_str()).or_else(|| item.get("content").and_then(|v| v.as_str()))
                {
                    ordered_content.push(serde_json::json!({"type": "text", "text": text}));
                }
            }
        }
    }

    if ordered_content.is_empty()
        && tool_calls.is_empty()
        && let Some(text) = data.get("text").and_then(|v| v.as_str())
        && !text.is_empty()
    {
        ordered_content.push(serde_json::json!({"type": "text", "text": text}));
    }

    let content = if has_non_text {
        MessageContent::Parts(ordered_content)
    } else {
        let joined: String =
            ordered_content.iter().filter_map(|v| v.get("text").and_then(|t| t.as_str())).collect();
        MessageContent::Text(joined)
    };

    let metadata = if citations.is_empty() {
        None
    } else {
        Some(serde_json::json!({"cohere": {"citations": citations}}))
    };

    let assistant_message = aigateway_protocol::ResponseMessage {
        role: "assistant".to_string(),
        content,
        tool_calls: if tool_calls.is_empty() { None } else { Some(serde_json::from_value(Value::Array(tool_calls))
            .map_err(|err| GatewayError::internal(format!("malformed tool call from cohere: {err}")))?) },
        metadata,
    };

    let finish_reason = data
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .or_else(|| message.get("finish_reason").and_then(|v| v.as_str()))
        .or_else(|| data.get("stop_reason").and_then(|v| v.as_str()))
        .unwrap_or("stop")
        .to_string();

    let choice = aigateway_protocol::Choice { index: 0, message: assistant_message, finish_reason };

    let now = OffsetDateTime::now_utc();
    let id = data
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("chatcmpl-cohere-{}", now.unix_timestamp_nanos() / 1_000_000));
    let object = data.get("object").and_then(|v| v.as_str()).unwrap_or("chat.completion").to_string();
    let created = data.get("created").and_then(|v| v.as_i64()).unwrap_or_else(|| now.unix_timestamp());
    let model = data.get("model").and_then(|v| v.as_str()).unwrap_or(request_model).to_string();
    let usage = normalize_usage(data.get("usage"));

    Ok(ChatCompletionResponse { id, object, created, model, choices: vec![choice], usage })
}

fn normalize_tool_call(tool: &Value) -> Option<Value> {
    let function = tool.get("function")?;
    let id = tool.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let kind = tool.get("type").and_then(|v| v.as_str()).unwrap_or("function").to_string();
    let name = function.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let arguments_str = match function.get("arguments") {
        Some(value @ (Value::Object(_) | Value::Array(_))) => {
            serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
        }
        Some(Value::String(s)) => s.clone(),
        _ => "{}".to_string(),
    };
    Some(serde_json::json!({
        "id": id,
        "type": kind,
        "function": {"name": name, "arguments": arguments_str},
    }))
}

fn resolve_response_image_url(source: Option<&Value>) -> Value {
    let Some(source) = source else { return serde_json::json!({"url": ""}) };
    let media_type = source.get("media_type").and_then(|v| v.as_str());
    if source.get("type").and_then(|v| v.as_str()) == Some("base64") {
        let data = source.get("data").and_then(|v| v.as_str()).unwrap_or("");
        let mt = media_type.unwrap_or("image/png");
        return serde_json::json!({"url": format!("data:{mt};base64,{data}")});
    }
    let url = source.get("url").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let mut obj = serde_json::Map::new();
    obj.insert("url".to_string(), serde_json::json!(url));
    if let Some(mt) = media_type {
        obj.insert("media_type".to_string(), serde_json::json!(mt));
    }
    Value::Object(obj)
}

fn normalize_usage(usage: Option<&Value>) -> Option<aigateway_protocol::Usage> {
    let usage = usage?;
    let (prompt, completion, mut total) = if let Some(tokens) = usage.get("tokens") {
        (
            tokens.get("input").or_else(|| tokens.get("prompt")).and_then(|v| v.as_i64()),
            tokens.get("output").or_else(|| tokens.get("generation")).and_then(|v| v.as_i64()),
            tokens.get("total").and_then(|v| v.as_i64()),
        )
    } else {
        (
            usage.get("prompt_tokens").and_then(|v| v.as_i64()),
            usage.get("completion_tokens").and_then(|v| v.as_i64()),
            usage.get("total_tokens").and_then(|v| v.as_i64()),
        )
    };
    if total.is_none()
        && let (Some(p), Some(c)) = (prompt, completion)
    {
        total = Some(p + c);
    }
    let result = aigateway_protocol::Usage { prompt_tokens: prompt, completion_tokens: completion, total_tokens: total };
    if result.is_empty() { None } else { Some(result) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_only_request_collapses_to_text_part() {
        let message =
            Message { role: "user".to_string(), content: Some(MessageContent::Text("hi".to_string())), extra: Default::default() };
        let parts = content_to_parts(message.content.as_ref().unwrap());
        assert_eq!(parts, vec![serde_json::json!({"type": "text", "text": "hi"})]);
    }

    #[test]
    fn image_part_resolves_url_source() {
        let part = serde_json::json!({"type": "input_image", "image": {"url": "https://example.com/x.png", "media_type": "image/png"}});
        let mapped = map_request_part(&part);
        assert_eq!(
            mapped,
            serde_json::json!({"type": "image", "source": {"type": "url", "url": "https://example.com/x.png", "media_type": "image/png"}})
        );
    }

    #[test]
    fn data_url_image_decodes_to_base64_source() {
        let part = serde_json::json!({"type": "image_url", "image_url": {"url": "data:image/png;base64,QUJD"}});
        let mapped = map_request_part(&part);
        assert_eq!(mapped, serde_json::json!({"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "QUJD"}}));
    }

    #[test]
    fn response_text_only_collapses_to_string() {
        let body = serde_json::json!({
            "message": {"content": [{"type": "text", "text": "hello"}]},
        });
        let response = normalize_response(body, "command-r").unwrap();
        assert_eq!(response.choices[0].message.content.as_text(), Some("hello"));
    }

    #[test]
    fn response_with_image_item_emits_part_list() {
        let body = serde_json::json!({
            "message": {"content": [
                {"type": "text", "text": "see"},
                {"type": "image", "source": {"type": "url", "url": "https://example.com/a.png"}},
            ]},
        });
        let response = normalize_response(body, "command-r").unwrap();
        match &response.choices[0].message.content {
            MessageContent::Parts(parts) => assert_eq!(parts.len(), 2),
            MessageContent::Text(_) => panic!("expected a part list"),
        }
    }

    #[test]
    fn usage_from_tokens_shape_computes_total() {
        let usage = serde_json::json!({"tokens": {"input": 10, "output": 5}});
        let normalized = normalize_usage(Some(&usage)).unwrap();
        assert_eq!(normalized.total_tokens, Some(15));
    }
}
