use aigateway_protocol::{ChatCompletionRequest, Message, MessageContent};

/// The cheapest possible chat call, used by every adapter's
/// `validate_api_key`: same endpoint, `max_tokens = 1`, a one-word
/// user message.
pub fn healthcheck_request(model: impl Into<String>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.into(),
        messages: vec![Message {
            role: "user".to_string(),
            content: Some(MessageContent::Text("ping".to_string())),
            extra: Default::default(),
        }],
        max_tokens: Some(1),
        ..Default::default()
    }
}
