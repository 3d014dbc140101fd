pub mod adapter;
pub mod config;
pub mod credential;
pub mod store;
pub mod store_error;
pub mod telemetry;

pub use adapter::{ProviderAdapter, ProviderResult};
pub use config::{AppConfig, ProviderDescriptor};
pub use credential::{ProviderCredential, ProviderState};
pub use store::{CredentialStore, EventStore, ProviderTraceStore};
pub use store_error::{StoreError, StoreResult};
pub use telemetry::{EventLevel, OrchestratorEvent, ProviderLog, RecordEventInput};
