pub mod client;
pub mod openai_shape;
pub mod pipeline;
pub mod probe;
pub mod providers;

pub use client::shared_client;
pub use pipeline::{AuthStyle, PipelineRequest, collapse_error_detail, send_and_classify};
pub use probe::healthcheck_request;
pub use providers::{CerebrasAdapter, CohereAdapter, GeminiAdapter, HuggingFaceAdapter, OpenRouterAdapter};
