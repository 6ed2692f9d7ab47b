//! Outbound HTTP clients.
//!
//! - `FoxyClient`: follows a subscription link with a bearer token
//! - `AirtableClient`: creates one record per accepted webhook
//!
//! Both share a single `reqwest::Client` built at startup, so connection
//! pooling and the per-call timeout are configured in one place.

pub mod airtable;
pub mod foxy;

use std::time::Duration;

use anyhow::{Context, Result};

pub use airtable::AirtableClient;
pub use foxy::FoxyClient;

/// Build the shared HTTP client used for every outbound call.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("foxy-airtable-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Read a response body for diagnostics, never failing.
pub(crate) async fn body_text(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(Duration::from_millis(500)).is_ok());
    }
}
