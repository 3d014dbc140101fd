use std::path::Path;

use anyhow::{Context, Result};

use aigateway_provider_core::AppConfig;

/// Reads the provider list from a JSON file. The on-disk config format is
/// left to the binary rather than the core crates; this loader is the one
/// concrete realization the binary needs.
pub fn load_app_config(path: &Path, events_enabled: bool, retention_days: i64) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read config file {}", path.display()))?;
    let providers: Vec<aigateway_provider_core::ProviderDescriptor> =
        serde_json::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))?;
    Ok(AppConfig { providers, events_enabled, retention_days })
}
