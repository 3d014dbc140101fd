use std::fmt;

/// Closed error taxonomy shared by adapters, the selector, and the ingress layer.
///
/// Adapters only ever report one of these kinds; the selector turns any of
/// them into a failover or a terminal failure, never anything finer-grained.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no credential on record for provider {provider_id}")]
    AuthMissing { provider_id: String },
    #[error("provider {provider_id} rejected the credential: {message}")]
    AuthRequired { provider_id: String, message: String },
    #[error("provider {provider_id} unavailable: {message}")]
    ProviderUnavailable { provider_id: String, message: String },
    #[error("configuration error: {message}")]
    ConfigError { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    pub fn auth_missing(provider_id: impl Into<String>) -> Self {
        Self::AuthMissing { provider_id: provider_id.into() }
    }

    pub fn auth_required(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthRequired { provider_id: provider_id.into(), message: message.into() }
    }

    pub fn provider_unavailable(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable { provider_id: provider_id.into(), message: message.into() }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// The provider a failed attempt was made against, if the error carries one.
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Self::AuthMissing { provider_id } => Some(provider_id),
            Self::AuthRequired { provider_id, .. } => Some(provider_id),
            Self::ProviderUnavailable { provider_id, .. } => Some(provider_id),
            Self::ConfigError { .. } | Self::Internal { .. } => None,
        }
    }

    /// The human-readable message carried by the error, independent of kind.
    pub fn message(&self) -> String {
        match self {
            Self::AuthMissing { provider_id } => format!("no credential on record for {provider_id}"),
            Self::AuthRequired { message, .. } => message.clone(),
            Self::ProviderUnavailable { message, .. } => message.clone(),
            Self::ConfigError { message } => message.clone(),
            Self::Internal { message } => message.clone(),
        }
    }

    /// Short machine-readable kind, used as the `code` in error bodies and as
    /// the credential-store error code for auth/unavailable kinds.
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::AuthMissing { .. } => GatewayErrorKind::AuthMissing,
            Self::AuthRequired { .. } => GatewayErrorKind::AuthRequired,
            Self::ProviderUnavailable { .. } => GatewayErrorKind::ProviderUnavailable,
            Self::ConfigError { .. } => GatewayErrorKind::ConfigError,
            Self::Internal { .. } => GatewayErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    AuthMissing,
    AuthRequired,
    ProviderUnavailable,
    ConfigError,
    Internal,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AuthMissing => "auth_missing",
            Self::AuthRequired => "auth_required",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ConfigError => "config_error",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}
