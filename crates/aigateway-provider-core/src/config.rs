use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configuration for one upstream vendor. `chat_completions_path` may carry a
/// `{model}` placeholder (Gemini) which adapters substitute themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub base_url: String,
    pub chat_completions_path: String,
    #[serde(default)]
    pub models: HashMap<String, String>,
    #[serde(default)]
    pub availability: serde_json::Value,
    #[serde(default)]
    pub credentials: serde_json::Value,
}

fn default_priority() -> i32 {
    100
}

impl ProviderDescriptor {
    pub fn default_model(&self) -> Option<&str> {
        self.models.get("default").map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub providers: Vec<ProviderDescriptor>,
    #[serde(default)]
    pub events_enabled: bool,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_retention_days() -> i64 {
    aigateway_common::DEFAULT_RETENTION_DAYS
}

impl AppConfig {
    /// Configured providers sorted ascending by priority; ties keep config order.
    pub fn providers_by_priority(&self) -> Vec<&ProviderDescriptor> {
        let mut indexed: Vec<(usize, &ProviderDescriptor)> = self.providers.iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| a.priority.cmp(&b.priority).then(ia.cmp(ib)));
        indexed.into_iter().map(|(_, p)| p).collect()
    }
}
