use async_trait::async_trait;

use aigateway_common::{GatewayError, RequestContext};
use aigateway_protocol::{ChatCompletionRequest, ChatCompletionResponse};

pub type ProviderResult<T> = Result<T, GatewayError>;

/// Every vendor adapter implements this contract; construction is lazy
/// (first use) and the instance is cached by the registry. Implementations
/// are `Send + Sync` and hold only immutable configuration plus a shared HTTP
/// client, so one instance is safe to call concurrently from many requests.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider_id(&self) -> &str;

    /// One attempt against the vendor. On success, clears the credential's
    /// error state and returns the normalized response. On failure, updates
    /// credential error state and writes a trace entry before returning `Err`.
    async fn chat_completions(
        &self,
        request: ChatCompletionRequest,
        ctx: &RequestContext,
    ) -> ProviderResult<ChatCompletionResponse>;

    /// The cheapest health call the vendor permits. Must not mutate
    /// credential state or write a trace entry regardless of outcome.
    async fn validate_api_key(&self, api_key: &str, ctx: &RequestContext) -> ProviderResult<()>;
}
