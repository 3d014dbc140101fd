use uuid::Uuid;

/// Per-request correlation bound at ingress and threaded explicitly through
/// the selector, adapters, and telemetry writes. There is no task-local or
/// global registry equivalent; a caller that needs the context passes it.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub provider_override: Option<String>,
}

impl RequestContext {
    /// Uses the inbound `X-Request-Id` header if present, otherwise mints a
    /// fresh 128-bit hex identifier.
    pub fn new(request_id: Option<String>, provider_override: Option<String>) -> Self {
        Self {
            request_id: request_id.unwrap_or_else(Self::mint_request_id),
            provider_override,
        }
    }

    pub fn mint_request_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}
