//! Ingress decoding: raw HTTP request to `NormalizedEvent`.
//!
//! ## Decoding Flow
//!
//! ```text
//! Request → read_request() → RawRequest → decode() → NormalizedEvent
//! ```
//!
//! The body is captured as unmodified bytes before any parsing so the
//! signature verifier sees exactly what the sender signed.

pub mod form;

use axum::{
    body::{to_bytes, Bytes},
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderMap, Method},
};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::DecodeError;

/// Header Foxy uses to name the webhook event (`transaction/created`, ...).
pub const EVENT_HEADER: &str = "foxy-webhook-event";

/// A request whose body has been read in full, untouched.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawRequest {
    pub fn new(method: Method, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            headers,
            body: body.into(),
        }
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Which decoding strategy produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePath {
    /// Body was a JSON document
    Json,
    /// `application/x-www-form-urlencoded` with an embedded JSON field
    UrlEncodedForm,
    /// `multipart/form-data` with an embedded JSON field
    MultipartForm,
}

impl DecodePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodePath::Json => "json",
            DecodePath::UrlEncodedForm => "urlencoded_form",
            DecodePath::MultipartForm => "multipart_form",
        }
    }
}

/// Decoded webhook payload, scoped to a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub path: DecodePath,
    /// Event name from the `Foxy-Webhook-Event` header, when sent
    pub event: Option<String>,
    pub payload: Value,
}

/// Check the method and capture the body.
///
/// Non-POST requests are rejected before the body stream is touched.
pub async fn read_request(request: Request, max_body_bytes: usize) -> Result<RawRequest, DecodeError> {
    if request.method() != Method::POST {
        return Err(DecodeError::MethodNotAllowed(request.method().to_string()));
    }

    let (parts, body) = request.into_parts();
    let body = to_bytes(body, max_body_bytes)
        .await
        .map_err(|e| DecodeError::UnreadableBody(e.to_string()))?;

    Ok(RawRequest::new(parts.method, parts.headers, body))
}

/// Decode a captured request into a `NormalizedEvent`.
///
/// The content type selects the strategy. Requests with no content type, or
/// one that is not a form type, are parsed as JSON.
pub async fn decode(request: &RawRequest, form_field: &str) -> Result<NormalizedEvent, DecodeError> {
    if request.method != Method::POST {
        return Err(DecodeError::MethodNotAllowed(request.method.to_string()));
    }

    let content_type = request.header(CONTENT_TYPE.as_str()).unwrap_or("");
    let path = detect_path(content_type);

    info!(
        content_type = %content_type,
        decode_path = path.as_str(),
        body_length = request.body.len(),
        "ingress_decode_start"
    );

    let payload = match path {
        DecodePath::Json => parse_json(&request.body)?,
        DecodePath::UrlEncodedForm => {
            let value = form::urlencoded_field(&request.body, form_field)?;
            parse_json(value.as_bytes())?
        }
        DecodePath::MultipartForm => {
            let value = form::multipart_field(content_type, request.body.clone(), form_field).await?;
            parse_json(value.as_bytes())?
        }
    };

    Ok(NormalizedEvent {
        path,
        event: request.header(EVENT_HEADER).map(str::to_string),
        payload,
    })
}

/// Pick the decoding strategy from a `Content-Type` value.
pub fn detect_path(content_type: &str) -> DecodePath {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "application/x-www-form-urlencoded" => DecodePath::UrlEncodedForm,
        "multipart/form-data" => DecodePath::MultipartForm,
        "application/json" => DecodePath::Json,
        m if m.ends_with("+json") => DecodePath::Json,
        other => {
            if !other.is_empty() {
                warn!(content_type = %other, "ingress_unknown_content_type");
            }
            DecodePath::Json
        }
    }
}

/// Parse JSON, keeping the offending bytes for the caller to log.
fn parse_json(bytes: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(bytes).map_err(|source| DecodeError::InvalidJson {
        source,
        raw: String::from_utf8_lossy(bytes).into_owned(),
    })
}
