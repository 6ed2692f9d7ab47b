//! Error taxonomy for the webhook pipeline.
//!
//! Every error is terminal for the request that produced it. Diagnostic
//! detail (raw bodies, upstream responses) stays in the error value for
//! logging; only the short `Display` text reaches the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::web::handlers::WebhookResponse;

/// Failures while turning the inbound request into a `NormalizedEvent`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("request body could not be read")]
    UnreadableBody(String),

    #[error("form body could not be decoded")]
    MalformedForm(String),

    #[error("form field `{0}` is missing")]
    MissingField(String),

    /// `raw` holds the bytes that failed to parse, lossily decoded.
    #[error("invalid JSON body")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
}

/// Failures of the webhook signature check.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("signature header `{0}` is missing")]
    MissingSignature(String),

    #[error("signature does not match")]
    InvalidSignature,
}

/// Failures of the two outbound calls.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("subscription fetch failed")]
    FetchFailed { status: Option<u16>, body: String },

    #[error("store write failed")]
    StoreWriteFailed { status: Option<u16>, body: String },

    #[error("{target} request timed out")]
    Timeout { target: &'static str },
}

/// Any error the relay can surface for a single request.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl RelayError {
    /// HTTP status used for this error. The mapping is the same on every path.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Decode(DecodeError::MethodNotAllowed(_)) => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Decode(_) => StatusCode::BAD_REQUEST,
            RelayError::Auth(_) => StatusCode::UNAUTHORIZED,
            RelayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable status string for the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Decode(DecodeError::MethodNotAllowed(_)) => "method_not_allowed",
            RelayError::Decode(DecodeError::UnreadableBody(_)) => "unreadable_body",
            RelayError::Decode(DecodeError::MalformedForm(_)) => "malformed_form",
            RelayError::Decode(DecodeError::MissingField(_)) => "missing_field",
            RelayError::Decode(DecodeError::InvalidJson { .. }) => "invalid_json",
            RelayError::Auth(_) => "unauthorized",
            RelayError::Upstream(UpstreamError::FetchFailed { .. }) => "fetch_failed",
            RelayError::Upstream(UpstreamError::StoreWriteFailed { .. }) => "store_write_failed",
            RelayError::Upstream(UpstreamError::Timeout { .. }) => "timeout",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = WebhookResponse::failure(self.kind(), self.to_string());
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_json() -> DecodeError {
        let source = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        DecodeError::InvalidJson {
            source,
            raw: "{nope".to_string(),
        }
    }

    #[test]
    fn test_status_codes() {
        let cases: Vec<(RelayError, StatusCode)> = vec![
            (
                DecodeError::MethodNotAllowed("GET".into()).into(),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
            (DecodeError::MissingField("FoxyData".into()).into(), StatusCode::BAD_REQUEST),
            (invalid_json().into(), StatusCode::BAD_REQUEST),
            (AuthError::InvalidSignature.into(), StatusCode::UNAUTHORIZED),
            (
                AuthError::MissingSignature("Foxy-Webhook-Signature".into()).into(),
                StatusCode::UNAUTHORIZED,
            ),
            (
                UpstreamError::FetchFailed { status: Some(404), body: String::new() }.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                UpstreamError::Timeout { target: "airtable" }.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{}", error);
        }
    }

    #[test]
    fn test_display_hides_diagnostics() {
        let error: RelayError = UpstreamError::StoreWriteFailed {
            status: Some(422),
            body: r#"{"error":"INVALID_VALUE_FOR_COLUMN"}"#.to_string(),
        }
        .into();

        assert_eq!(error.to_string(), "store write failed");
        assert_eq!(error.kind(), "store_write_failed");

        let error: RelayError = invalid_json().into();
        assert_eq!(error.to_string(), "invalid JSON body");
    }

    #[test]
    fn test_into_response_status() {
        let response = RelayError::from(AuthError::InvalidSignature).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
