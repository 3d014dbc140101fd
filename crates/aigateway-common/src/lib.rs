pub mod context;
pub mod error;
pub mod retention;

pub use context::RequestContext;
pub use error::{GatewayError, GatewayErrorKind};
pub use retention::{retention_cutoff, start_of_today_utc};

/// Default number of days (including today) an event row is retained for.
pub const DEFAULT_RETENTION_DAYS: i64 = 2;
