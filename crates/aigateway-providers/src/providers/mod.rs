pub mod cerebras;
pub mod cohere;
pub mod gemini;
pub mod huggingface;
pub mod openrouter;

pub use cerebras::CerebrasAdapter;
pub use cohere::CohereAdapter;
pub use gemini::GeminiAdapter;
pub use huggingface::HuggingFaceAdapter;
pub use openrouter::OpenRouterAdapter;
