//! Webhook endpoint handlers.
//!
//! The Foxy endpoint accepts every method so that wrong-method requests get
//! the same JSON error shape as other failures, and are rejected before
//! their body is read.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{DecodeError, RelayError, UpstreamError};
use crate::ingress::EVENT_HEADER;
use crate::relay::{Relay, RelayOutcome};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(config: Config, relay: Relay) -> Self {
        Self {
            config: Arc::new(config),
            relay: Arc::new(relay),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Foxy Webhook
// =============================================================================

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airtable: Option<Value>,
}

impl WebhookResponse {
    pub fn failure(status: &'static str, message: String) -> Self {
        Self {
            status,
            message: Some(message),
            record_id: None,
            airtable: None,
        }
    }
}

/// Foxy webhook endpoint.
///
/// This endpoint:
/// 1. Rejects anything but POST
/// 2. Verifies the HMAC signature (if configured)
/// 3. Decodes and maps the payload
/// 4. Creates the Airtable record and acknowledges
pub async fn foxy_webhook(State(state): State<AppState>, request: Request) -> Response {
    {
        let headers = request.headers();
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        info!(
            method = %request.method(),
            content_type = ?header(CONTENT_TYPE.as_str()),
            event = ?header(EVENT_HEADER),
            has_signature = header(state.config.signature_header.as_str()).is_some(),
            "foxy_webhook_received"
        );
    }

    match state.relay.handle(request).await {
        Ok(RelayOutcome::Created {
            record_id,
            response,
        }) => {
            info!(record_id = ?record_id, "foxy_webhook_recorded");
            let body = WebhookResponse {
                status: "created",
                message: None,
                record_id,
                airtable: state.config.echo_store_response.then_some(response),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(RelayOutcome::Ignored { reason }) => {
            info!(reason = reason, "foxy_webhook_ignored");
            let body = WebhookResponse {
                status: "ignored",
                message: Some(reason.to_string()),
                record_id: None,
                airtable: None,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            log_failure(&e);
            e.into_response()
        }
    }
}

/// Log the full diagnostic detail that is withheld from the caller.
fn log_failure(err: &RelayError) {
    let status = err.status_code().as_u16();
    match err {
        RelayError::Decode(DecodeError::InvalidJson { source, raw }) => {
            error!(status_code = status, error = %source, raw_body = %raw, "foxy_webhook_invalid_json");
        }
        RelayError::Decode(DecodeError::MethodNotAllowed(method)) => {
            warn!(status_code = status, method = %method, "foxy_webhook_method_not_allowed");
        }
        RelayError::Decode(e) => {
            warn!(status_code = status, error = ?e, "foxy_webhook_decode_failed");
        }
        RelayError::Auth(e) => {
            warn!(status_code = status, error = %e, "foxy_webhook_unauthorized");
        }
        RelayError::Upstream(UpstreamError::FetchFailed { status: upstream, body })
        | RelayError::Upstream(UpstreamError::StoreWriteFailed { status: upstream, body }) => {
            error!(
                status_code = status,
                upstream_status = ?upstream,
                upstream_body = %body,
                error = %err,
                "foxy_webhook_upstream_failed"
            );
        }
        RelayError::Upstream(e) => {
            error!(status_code = status, error = %e, "foxy_webhook_upstream_failed");
        }
    }
}
