use time::OffsetDateTime;

use crate::config::ProviderDescriptor;

/// One row per provider. `last_error_at` is null iff `last_error` is null;
/// `api_key` is never logged or placed in telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCredential {
    pub provider_id: String,
    pub api_key: String,
    pub last_error: Option<String>,
    pub last_error_at: Option<OffsetDateTime>,
    pub updated_at: OffsetDateTime,
}

/// Derived, never persisted: configuration joined with the current credential row.
#[derive(Debug, Clone)]
pub struct ProviderState {
    pub provider: ProviderDescriptor,
    pub credential: Option<ProviderCredential>,
}

impl ProviderState {
    pub fn has_api_key(&self) -> bool {
        self.credential.as_ref().is_some_and(|c| !c.api_key.is_empty())
    }

    pub fn is_available(&self) -> bool {
        self.has_api_key() && self.credential.as_ref().is_some_and(|c| c.last_error.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn descriptor() -> ProviderDescriptor {
        ProviderDescriptor {
            id: "cerebras".to_string(),
            name: "Cerebras".to_string(),
            priority: 10,
            base_url: "https://api.cerebras.ai".to_string(),
            chat_completions_path: "/v1/chat/completions".to_string(),
            models: HashMap::new(),
            availability: serde_json::Value::Null,
            credentials: serde_json::Value::Null,
        }
    }

    #[test]
    fn no_credential_row_is_unavailable() {
        let state = ProviderState { provider: descriptor(), credential: None };
        assert!(!state.has_api_key());
        assert!(!state.is_available());
    }

    #[test]
    fn credential_with_error_is_unavailable() {
        let state = ProviderState {
            provider: descriptor(),
            credential: Some(ProviderCredential {
                provider_id: "cerebras".to_string(),
                api_key: "sk-1".to_string(),
                last_error: Some("rate_limit".to_string()),
                last_error_at: Some(OffsetDateTime::now_utc()),
                updated_at: OffsetDateTime::now_utc(),
            }),
        };
        assert!(state.has_api_key());
        assert!(!state.is_available());
    }

    #[test]
    fn clean_credential_is_available() {
        let state = ProviderState {
            provider: descriptor(),
            credential: Some(ProviderCredential {
                provider_id: "cerebras".to_string(),
                api_key: "sk-1".to_string(),
                last_error: None,
                last_error_at: None,
                updated_at: OffsetDateTime::now_utc(),
            }),
        };
        assert!(state.is_available());
    }
}
