use std::sync::Arc;

use time::format_description::well_known::Rfc3339;

use aigateway_common::{GatewayError, RequestContext};
use aigateway_provider_core::{CredentialStore, EventLevel, EventStore, RecordEventInput};

use crate::registry::ProviderSource;

/// Rejections carry enough shape for the ingress layer to pick an HTTP
/// status without re-inspecting a `GatewayError`.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ClientError(String),
    #[error("{0}")]
    ServiceUnavailable(String),
}

/// One row of the admin provider dashboard (list providers).
#[derive(Debug, Clone)]
pub struct ProviderDashboardRow {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub has_api_key: bool,
    pub last_error: Option<String>,
    pub last_error_at: Option<String>,
}

pub struct AdminOps {
    registry: Arc<dyn ProviderSource>,
    credentials: Arc<dyn CredentialStore>,
    events: Arc<dyn EventStore>,
}

impl AdminOps {
    pub fn new(registry: Arc<dyn ProviderSource>, credentials: Arc<dyn CredentialStore>, events: Arc<dyn EventStore>) -> Self {
        Self { registry, credentials, events }
    }

    /// Validates `api_key` against the live vendor before persisting it.
    pub async fn set_credential(&self, provider_id: &str, api_key: &str, ctx: &RequestContext) -> Result<(), AdminError> {
        let adapter = self.adapter_for(provider_id).await?;

        match adapter.validate_api_key(api_key, ctx).await {
            Ok(()) => {
                self.credentials.upsert(provider_id, api_key).await.map_err(backend_unavailable)?;
                self.events
                    .record_event(
                        RecordEventInput::new("provider_credentials_updated", EventLevel::Info)
                            .provider_to(provider_id)
                            .request_id(ctx.request_id.clone()),
                    )
                    .await;
                Ok(())
            }
            Err(GatewayError::AuthRequired { message, .. }) => {
                self.credentials.record_error(provider_id, "auth").await.map_err(backend_unavailable)?;
                self.events
                    .record_event(
                        RecordEventInput::new("provider_credentials_invalid", EventLevel::Warning)
                            .provider_to(provider_id)
                            .message(message.clone())
                            .request_id(ctx.request_id.clone()),
                    )
                    .await;
                Err(AdminError::ClientError(message))
            }
            Err(err) => {
                let message = err.message();
                self.events
                    .record_event(
                        RecordEventInput::new("provider_health_fail", EventLevel::Warning)
                            .provider_to(provider_id)
                            .message(message.clone())
                            .request_id(ctx.request_id.clone()),
                    )
                    .await;
                Err(AdminError::ServiceUnavailable(message))
            }
        }
    }

    /// Re-validates the credential already on record, clearing its error
    /// state on success. Rejects with `NotFound` if no credential exists.
    pub async fn healthcheck(&self, provider_id: &str, ctx: &RequestContext) -> Result<(), AdminError> {
        let adapter = self.adapter_for(provider_id).await?;
        let api_key = self
            .credentials
            .get(provider_id)
            .await
            .map_err(backend_unavailable)?
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AdminError::NotFound(format!("no credential on record for {provider_id}")))?;

        match adapter.validate_api_key(&api_key, ctx).await {
            Ok(()) => {
                self.credentials.clear_error(provider_id).await.map_err(backend_unavailable)?;
                self.events
                    .record_event(
                        RecordEventInput::new("provider_health_ok", EventLevel::Info)
                            .provider_to(provider_id)
                            .request_id(ctx.request_id.clone()),
                    )
                    .await;
                Ok(())
            }
            Err(GatewayError::AuthRequired { message, .. }) => {
                self.credentials.record_error(provider_id, "auth").await.map_err(backend_unavailable)?;
                self.events
                    .record_event(
                        RecordEventInput::new("provider_credentials_invalid", EventLevel::Warning)
                            .provider_to(provider_id)
                            .message(message.clone())
                            .request_id(ctx.request_id.clone()),
                    )
                    .await;
                Err(AdminError::ClientError(message))
            }
            Err(err) => {
                let message = err.message();
                self.events
                    .record_event(
                        RecordEventInput::new("provider_health_fail", EventLevel::Warning)
                            .provider_to(provider_id)
                            .message(message.clone())
                            .request_id(ctx.request_id.clone()),
                    )
                    .await;
                Err(AdminError::ServiceUnavailable(message))
            }
        }
    }

    pub async fn delete_credential(&self, provider_id: &str) -> Result<(), AdminError> {
        let removed = self.credentials.delete(provider_id).await.map_err(backend_unavailable)?;
        if !removed {
            return Err(AdminError::NotFound(format!("no credential on record for {provider_id}")));
        }
        Ok(())
    }

    pub async fn list_providers(&self) -> Vec<ProviderDashboardRow> {
        let rows = self.credentials.list().await.unwrap_or_default();
        self.registry
            .providers()
            .into_iter()
            .map(|provider| {
                let credential = rows.iter().find(|c| c.provider_id == provider.id);
                ProviderDashboardRow {
                    id: provider.id,
                    name: provider.name,
                    priority: provider.priority,
                    has_api_key: credential.is_some_and(|c| !c.api_key.is_empty()),
                    last_error: credential.and_then(|c| c.last_error.clone()),
                    last_error_at: credential
                        .and_then(|c| c.last_error_at)
                        .and_then(|ts| ts.format(&Rfc3339).ok()),
                }
            })
            .collect()
    }

    async fn adapter_for(&self, provider_id: &str) -> Result<Arc<dyn aigateway_provider_core::ProviderAdapter>, AdminError> {
        self.registry.get_adapter(provider_id).await.map_err(|err| AdminError::NotFound(err.message()))
    }
}

fn backend_unavailable(err: aigateway_provider_core::StoreError) -> AdminError {
    AdminError::ServiceUnavailable(err.to_string())
}
