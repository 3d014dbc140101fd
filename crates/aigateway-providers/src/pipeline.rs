use std::time::Duration;

use aigateway_common::GatewayError;
use aigateway_provider_core::{CredentialStore, ProviderResult, ProviderTraceStore};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the vendor wants the API key presented. Every vendor but Gemini uses
/// a bearer token; Gemini wants its own header.
#[derive(Debug, Clone, Copy)]
pub enum AuthStyle {
    Bearer,
    GoogApiKey,
}

pub struct PipelineRequest<'a> {
    pub provider_id: &'a str,
    pub url: String,
    pub payload: serde_json::Value,
    pub api_key: &'a str,
    pub auth_style: AuthStyle,
    pub request_id: Option<&'a str>,
    /// `false` for `validate_api_key` calls: suppresses both credential
    /// mutation and trace writes.
    pub track_errors: bool,
}

/// Shared HTTP pipeline used by every vendor adapter:
/// sends the request, classifies the outcome, and updates credential/trace
/// state accordingly. `rate_limit_detail` lets a vendor enrich the
/// "Provider quota exhausted" message from the error body (Gemini does; the
/// others pass a closure that always returns `None`).
pub async fn send_and_classify(
    client: &wreq::Client,
    req: PipelineRequest<'_>,
    credentials: &dyn CredentialStore,
    traces: &dyn ProviderTraceStore,
    rate_limit_detail: impl Fn(&serde_json::Value) -> Option<String>,
) -> ProviderResult<serde_json::Value> {
    let PipelineRequest { provider_id, url, payload, api_key, auth_style, request_id, track_errors } = req;

    let mut builder = client.post(&url).json(&payload).timeout(REQUEST_TIMEOUT);
    builder = match auth_style {
        AuthStyle::Bearer => builder.header("Authorization", format!("Bearer {api_key}")),
        AuthStyle::GoogApiKey => builder.header("x-goog-api-key", api_key),
    };
    builder = builder.header("Content-Type", "application/json");

    let response = match builder.send().await {
        Ok(response) => response,
        Err(_) => {
            return fail(
                provider_id,
                Some("network"),
                GatewayError::provider_unavailable(provider_id, "Provider request failed"),
                None,
                None,
                &payload,
                credentials,
                traces,
                request_id,
                track_errors,
            )
            .await;
        }
    };

    let status = response.status().as_u16();

    if status == 401 {
        let body = extract_body(response).await;
        return fail(
            provider_id,
            Some("auth"),
            GatewayError::auth_required(provider_id, "Provider rejected the credential"),
            Some(status),
            Some(body),
            &payload,
            credentials,
            traces,
            request_id,
            track_errors,
        )
        .await;
    }

    if matches!(status, 402 | 403 | 429) {
        let body = extract_body(response).await;
        let mut message = "Provider quota exhausted".to_string();
        if let Some(detail) = rate_limit_detail(&body) {
            message.push_str(": ");
            message.push_str(&detail);
        }
        return fail(
            provider_id,
            Some("rate_limit"),
            GatewayError::provider_unavailable(provider_id, message),
            Some(status),
            Some(body),
            &payload,
            credentials,
            traces,
            request_id,
            track_errors,
        )
        .await;
    }

    if status >= 400 {
        let body = extract_body(response).await;
        return fail(
            provider_id,
            Some(&format!("http_{status}")),
            GatewayError::provider_unavailable(provider_id, "Provider error"),
            Some(status),
            Some(body),
            &payload,
            credentials,
            traces,
            request_id,
            track_errors,
        )
        .await;
    }

    let body = extract_body(response).await;
    if !body.is_object() {
        return fail(
            provider_id,
            None,
            GatewayError::provider_unavailable(provider_id, "Unexpected response format"),
            Some(status),
            Some(body),
            &payload,
            credentials,
            traces,
            request_id,
            track_errors,
        )
        .await;
    }

    if track_errors {
        if let Err(err) = credentials.clear_error(provider_id).await {
            tracing::warn!(event = "credential_clear_error_failed", provider = provider_id, error = %err);
        }
        traces.record_provider_log(provider_id, payload.clone(), body.clone(), request_id).await;
    }

    Ok(body)
}

/// Collapses a trimmed, whitespace-collapsed `error.status`/`error.message`
/// pair into a single detail string, capped at 300 chars (Gemini's
/// rate-limit detail enrichment).
pub fn collapse_error_detail(body: &serde_json::Value, max_len: usize) -> Option<String> {
    let error = body.get("error")?;
    let status = error.get("status").and_then(|v| v.as_str());
    let message = error.get("message").and_then(|v| v.as_str());
    let combined = match (status, message) {
        (Some(status), Some(message)) => format!("{status}: {message}"),
        (Some(status), None) => status.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => return None,
    };
    let collapsed: String = combined.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(collapsed.chars().take(max_len).collect())
}

async fn extract_body(response: wreq::Response) -> serde_json::Value {
    match response.bytes().await {
        Ok(bytes) => match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => value,
            Err(_) => serde_json::Value::String(String::from_utf8_lossy(&bytes).to_string()),
        },
        Err(_) => serde_json::Value::Null,
    }
}

#[allow(clippy::too_many_arguments)]
async fn fail(
    provider_id: &str,
    code: Option<&str>,
    error: GatewayError,
    status_code: Option<u16>,
    response_body: Option<serde_json::Value>,
    request_payload: &serde_json::Value,
    credentials: &dyn CredentialStore,
    traces: &dyn ProviderTraceStore,
    request_id: Option<&str>,
    track_errors: bool,
) -> ProviderResult<serde_json::Value> {
    if !track_errors {
        return Err(error);
    }

    if let Some(code) = code
        && let Err(err) = credentials.record_error(provider_id, code).await
    {
        tracing::warn!(event = "credential_record_error_failed", provider = provider_id, error = %err);
    }

    let mut error_obj = serde_json::json!({
        "type": code.unwrap_or("bad_response"),
        "message": error.message(),
    });
    if let Some(status) = status_code {
        error_obj["status_code"] = serde_json::json!(status);
    }
    let mut trace_body = serde_json::json!({ "error": error_obj });
    if let Some(response_body) = response_body {
        trace_body["response"] = response_body;
    }

    traces.record_provider_log(provider_id, request_payload.clone(), trace_body, request_id).await;
    Err(error)
}
