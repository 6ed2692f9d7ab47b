//! Foxy hypermedia API client for the secondary subscription fetch.
//!
//! Links come from the webhook payload, so only hrefs on the configured API
//! origin are followed; the bearer token never leaves that origin.

use anyhow::{Context, Result};
use reqwest::{header::ACCEPT, Client};
use serde_json::Value;
use tracing::{error, info, warn};
use url::{Origin, Url};

use super::body_text;
use crate::error::UpstreamError;

/// Header Foxy requires on every API call.
pub const API_VERSION_HEADER: &str = "FOXY-API-VERSION";

/// Client for following `fx:subscription` links.
#[derive(Clone)]
pub struct FoxyClient {
    http: Client,
    origin: Origin,
    access_token: String,
    api_version: String,
}

impl FoxyClient {
    pub fn new(
        http: Client,
        api_url: &str,
        access_token: String,
        api_version: String,
    ) -> Result<Self> {
        let origin = Url::parse(api_url)
            .with_context(|| format!("Invalid Foxy API URL: {}", api_url))?
            .origin();

        Ok(Self {
            http,
            origin,
            access_token,
            api_version,
        })
    }

    /// Parse `href` and confirm it points at the Foxy API.
    fn trusted_url(&self, href: &str) -> Result<Url, UpstreamError> {
        let refused = |reason: &str| {
            warn!(href = %href, reason = reason, "foxy_fetch_refused");
            UpstreamError::FetchFailed {
                status: None,
                body: format!("refused subscription link: {}", reason),
            }
        };

        let url = Url::parse(href).map_err(|_| refused("not an absolute URL"))?;
        if url.origin() != self.origin {
            return Err(refused("outside the Foxy API origin"));
        }
        Ok(url)
    }

    /// GET a subscription resource and return its JSON.
    pub async fn fetch_subscription(&self, href: &str) -> Result<Value, UpstreamError> {
        let url = self.trusted_url(href)?;
        info!(href = %href, "foxy_fetch_starting");

        let timeout_or_failed = |e: reqwest::Error, status: Option<u16>| {
            if e.is_timeout() {
                error!(href = %href, error = %e, "foxy_fetch_timeout");
                UpstreamError::Timeout { target: "foxy" }
            } else {
                error!(href = %href, error = %e, "foxy_fetch_request_error");
                UpstreamError::FetchFailed {
                    status,
                    body: e.to_string(),
                }
            }
        };

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .header(API_VERSION_HEADER, &self.api_version)
            .header(ACCEPT, "application/hal+json")
            .send()
            .await
            .map_err(|e| timeout_or_failed(e, None))?;

        let status = response.status();
        if !status.is_success() {
            let body = body_text(response).await;
            error!(
                href = %href,
                status_code = status.as_u16(),
                body = %body,
                "foxy_fetch_failed"
            );
            return Err(UpstreamError::FetchFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| timeout_or_failed(e, Some(status.as_u16())))?;
        let subscription: Value = serde_json::from_str(&body).map_err(|e| {
            error!(href = %href, error = %e, body = %body, "foxy_fetch_invalid_json");
            UpstreamError::FetchFailed {
                status: Some(status.as_u16()),
                body: body.clone(),
            }
        })?;

        info!(href = %href, status_code = status.as_u16(), "foxy_fetch_complete");

        Ok(subscription)
    }
}

impl std::fmt::Debug for FoxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoxyClient")
            .field("access_token", &"<REDACTED>")
            .field("api_version", &self.api_version)
            .finish()
    }
}
