use clap::Parser;

/// Startup knobs; every field can also be set by its matching env var so the
/// binary runs the same under a process supervisor as it does by hand.
#[derive(Debug, Clone, Parser)]
#[command(name = "aigateway", version, about = "OpenAI-compatible failover gateway for multiple LLM vendors")]
pub struct Cli {
    /// Path to the JSON provider configuration file.
    #[arg(long, env = "AIGATEWAY_CONFIG")]
    pub config: String,

    /// Database DSN for credentials/events/trace storage.
    #[arg(long, env = "AIGATEWAY_DSN", default_value = "sqlite://aigateway.db?mode=rwc")]
    pub dsn: String,

    #[arg(long, env = "AIGATEWAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "AIGATEWAY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Truthy enables the Event Store; read from `EVENTS_ENABLED`.
    #[arg(long, env = "EVENTS_ENABLED")]
    pub events_enabled: Option<String>,
}

impl Cli {
    pub fn events_enabled(&self) -> bool {
        matches!(
            self.events_enabled.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true" | "yes" | "on")
        )
    }
}
