use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use aigateway_common::{GatewayError, GatewayErrorKind};
use aigateway_core::AdminError;
use aigateway_protocol::ErrorBody;

/// Maps the closed `GatewayError` taxonomy onto a status/`code` table:
/// `auth_missing`/`auth_required` -> 401, everything else the Selector can
/// return -> 429, with the generic `500` reserved for defects this layer
/// itself can't classify.
pub struct IngressError(pub GatewayError);

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let (status, code) = match self.0.kind() {
            GatewayErrorKind::AuthMissing | GatewayErrorKind::AuthRequired => {
                (StatusCode::UNAUTHORIZED, "provider_auth_required")
            }
            GatewayErrorKind::ProviderUnavailable => (StatusCode::TOO_MANY_REQUESTS, "provider_unavailable"),
            GatewayErrorKind::ConfigError => (StatusCode::TOO_MANY_REQUESTS, "provider_unavailable"),
            GatewayErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let body = ErrorBody::new(self.0.message(), "gateway_error", code);
        (status, Json(body)).into_response()
    }
}

pub struct AdminHttpError(pub AdminError);

impl IntoResponse for AdminHttpError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            AdminError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AdminError::ClientError(_) => (StatusCode::BAD_REQUEST, "client_error"),
            AdminError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
        };
        let body = ErrorBody::new(self.0.to_string(), "admin_error", code);
        (status, Json(body)).into_response()
    }
}
