use std::fmt;

use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Arguments to `EventStore::record_event`. Borrowed where possible since
/// every call site already owns short-lived strings built for the log line.
#[derive(Debug, Clone)]
pub struct RecordEventInput {
    pub kind: String,
    pub level: EventLevel,
    pub message: Option<String>,
    pub request_id: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub provider_from: Option<String>,
    pub provider_to: Option<String>,
    pub model: Option<String>,
    pub error_code: Option<String>,
}

impl RecordEventInput {
    pub fn new(kind: impl Into<String>, level: EventLevel) -> Self {
        Self {
            kind: kind.into(),
            level,
            message: None,
            request_id: None,
            meta: None,
            provider_from: None,
            provider_to: None,
            model: None,
            error_code: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn provider_from(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_from = Some(provider_id.into());
        self
    }

    pub fn provider_to(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_to = Some(provider_id.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// A persisted structured record of an orchestrator-level decision.
#[derive(Debug, Clone)]
pub struct OrchestratorEvent {
    pub id: i64,
    pub ts: OffsetDateTime,
    pub level: EventLevel,
    pub kind: String,
    pub request_id: Option<String>,
    pub provider_from: Option<String>,
    pub provider_to: Option<String>,
    pub model: Option<String>,
    pub error_code: Option<String>,
    pub message: Option<String>,
    pub meta: serde_json::Value,
}

/// A persisted record of one upstream request/response or error.
#[derive(Debug, Clone)]
pub struct ProviderLog {
    pub id: i64,
    pub provider_id: String,
    pub created_at: OffsetDateTime,
    pub request_id: Option<String>,
    pub request_body: serde_json::Value,
    pub response_body: serde_json::Value,
}

impl ProviderLog {
    pub fn request_body_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.request_body).unwrap_or_else(|_| self.request_body.to_string())
    }

    pub fn response_body_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.response_body).unwrap_or_else(|_| self.response_body.to_string())
    }
}
