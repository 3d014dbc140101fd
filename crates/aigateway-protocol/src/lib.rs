pub mod request;
pub mod response;

pub use request::{ChatCompletionRequest, Message, MessageContent};
pub use response::{ChatCompletionResponse, Choice, ErrorBody, ErrorDetail, ResponseMessage, ToolCall, ToolCallFunction, Usage};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_string_content() {
        let json = r#"{"model":"gpt","messages":[{"role":"user","content":"hi"}]}"#;
        let req: ChatCompletionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.messages[0].content.as_ref().unwrap().as_text(), Some("hi"));
    }

    #[test]
    fn request_round_trips_part_list_content() {
        let json = r#"{"model":"gpt","messages":[{"role":"user","content":[{"type":"text","text":"hi"}]}]}"#;
        let req: ChatCompletionRequest = serde_json::from_str(json).unwrap();
        match req.messages[0].content.as_ref().unwrap() {
            MessageContent::Parts(parts) => assert_eq!(parts.len(), 1),
            MessageContent::Text(_) => panic!("expected parts"),
        }
    }

    #[test]
    fn empty_model_is_allowed() {
        let json = r#"{"messages":[]}"#;
        let req: ChatCompletionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.model, "");
    }

    #[test]
    fn error_body_serializes_nested_error_object() {
        let body = ErrorBody::new("boom", "provider_unavailable", "provider_unavailable");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"]["message"], "boom");
    }
}
