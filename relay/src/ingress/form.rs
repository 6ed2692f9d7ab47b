//! Form-encoded submissions carrying an embedded JSON field.
//!
//! Foxy's legacy datafeed posts the payload as a single form field
//! (`FoxyData` by default) whose value is a JSON string.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart},
    http::{header::CONTENT_TYPE, Method, Request},
};
use tracing::{info, warn};

use crate::error::DecodeError;

/// Find `field` in an `application/x-www-form-urlencoded` body.
pub fn urlencoded_field(body: &[u8], field: &str) -> Result<String, DecodeError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| DecodeError::MalformedForm(e.to_string()))?;

    info!(field_count = pairs.len(), "form_urlencoded_parsed");

    pairs
        .into_iter()
        .find(|(name, _)| name == field)
        .map(|(_, value)| value)
        .ok_or_else(|| missing(field))
}

/// Find `field` in a `multipart/form-data` body.
///
/// The body has already been captured, so it is replayed through axum's
/// multipart extractor rather than read from the connection again.
pub async fn multipart_field(
    content_type: &str,
    body: Bytes,
    field: &str,
) -> Result<String, DecodeError> {
    let request = Request::builder()
        .method(Method::POST)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .map_err(|e| DecodeError::MalformedForm(e.to_string()))?;

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| DecodeError::MalformedForm(rejection.to_string()))?;

    let mut seen = 0usize;
    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| DecodeError::MalformedForm(e.to_string()))?
    {
        seen += 1;
        if part.name() == Some(field) {
            info!(field = %field, part_index = seen, "form_multipart_field_found");
            return part
                .text()
                .await
                .map_err(|e| DecodeError::MalformedForm(e.to_string()));
        }
    }

    info!(field_count = seen, "form_multipart_parsed");
    Err(missing(field))
}

fn missing(field: &str) -> DecodeError {
    warn!(field = %field, "form_field_missing");
    DecodeError::MissingField(field.to_string())
}
