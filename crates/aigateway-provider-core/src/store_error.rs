/// Error surfaced by a persistence-backed store operation. Kept independent
/// of `GatewayError`: store failures are an infrastructure concern, not part
/// of the adapter/selector error taxonomy, and most writers of this error
/// swallow it rather than propagate it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
