use time::OffsetDateTime;

use aigateway_common::GatewayError;
use aigateway_protocol::{ChatCompletionRequest, ChatCompletionResponse};

/// Builds the OpenAI-shaped payload shared by Cerebras and OpenRouter:
/// `model` and `messages` verbatim, plus any non-null optional scalar.
pub fn build_payload(request: &ChatCompletionRequest) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "model": request.model,
        "messages": request.messages,
    });
    let obj = payload.as_object_mut().expect("object literal");
    if let Some(v) = request.temperature {
        obj.insert("temperature".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.max_tokens {
        obj.insert("max_tokens".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.stream {
        obj.insert("stream".to_string(), serde_json::json!(v));
    }
    if let Some(ref v) = request.user {
        obj.insert("user".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.presence_penalty {
        obj.insert("presence_penalty".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.frequency_penalty {
        obj.insert("frequency_penalty".to_string(), serde_json::json!(v));
    }
    if let Some(v) = request.top_p {
        obj.insert("top_p".to_string(), serde_json::json!(v));
    }
    payload
}

/// Fills in the defaults common to every vendor that already speaks
/// (roughly) the OpenAI response shape: missing `id`, `object`, `created`,
/// `model`.
fn fill_defaults(body: &mut serde_json::Value, provider: &str, request_model: &str) {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let Some(obj) = body.as_object_mut() else { return };
    obj.entry("id").or_insert_with(|| serde_json::json!(format!("chatcmpl-{provider}-{now}")));
    obj.entry("object").or_insert_with(|| serde_json::json!("chat.completion"));
    obj.entry("created").or_insert_with(|| serde_json::json!(now));
    obj.entry("model").or_insert_with(|| serde_json::json!(request_model));
}

/// Fills in the shared defaults and decodes the result into the normalized
/// response type. The pipeline already guarantees `body` is a JSON object.
pub fn decode_response(
    mut body: serde_json::Value,
    provider: &str,
    request_model: &str,
) -> Result<ChatCompletionResponse, GatewayError> {
    fill_defaults(&mut body, provider, request_model);
    serde_json::from_value(body)
        .map_err(|err| GatewayError::internal(format!("malformed response from {provider}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_payload_forwards_only_present_scalars() {
        let request = ChatCompletionRequest {
            model: "m".to_string(),
            messages: vec![],
            temperature: Some(0.5),
            ..Default::default()
        };
        let payload = build_payload(&request);
        assert_eq!(payload["temperature"], serde_json::json!(0.5));
        assert!(payload.get("max_tokens").is_none());
    }

    #[test]
    fn decode_response_fills_missing_defaults() {
        let body = serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}, "finish_reason": "stop"}],
        });
        let response = decode_response(body, "cerebras", "llama").unwrap();
        assert_eq!(response.object, "chat.completion");
        assert_eq!(response.model, "llama");
        assert!(response.id.starts_with("chatcmpl-cerebras-"));
    }

    #[test]
    fn decode_response_preserves_present_fields() {
        let body = serde_json::json!({
            "id": "abc",
            "object": "chat.completion",
            "created": 1,
            "model": "explicit",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}, "finish_reason": "stop"}],
        });
        let response = decode_response(body, "cerebras", "llama").unwrap();
        assert_eq!(response.id, "abc");
        assert_eq!(response.model, "explicit");
    }
}
