pub mod admin;
pub mod registry;
pub mod selector;

pub use admin::{AdminError, AdminOps, ProviderDashboardRow};
pub use registry::{ProviderRegistry, ProviderSource};
pub use selector::Selector;
