//! Airtable REST client for creating records.
//!
//! Reference: https://airtable.com/developers/web/api/create-records

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use url::Url;

use super::body_text;
use crate::error::UpstreamError;
use crate::mapping::OutboundRecord;

/// Request body for the create endpoint: `{ "records": [ { "fields": ... } ] }`.
#[derive(Debug, Serialize)]
struct CreateRecordsRequest<'a> {
    records: [RecordEnvelope<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RecordEnvelope<'a> {
    fields: &'a OutboundRecord,
}

/// Client bound to one base and table.
#[derive(Clone)]
pub struct AirtableClient {
    http: Client,
    records_url: Url,
    token: String,
}

impl AirtableClient {
    /// Create a client for `{api_url}/{base_id}/{table_name}`.
    ///
    /// Base id and table name are pushed as path segments, so spaces and
    /// slashes in the table name are percent-encoded.
    pub fn new(
        http: Client,
        api_url: &str,
        base_id: &str,
        table_name: &str,
        token: String,
    ) -> Result<Self> {
        let mut records_url =
            Url::parse(api_url).with_context(|| format!("Invalid Airtable API URL: {}", api_url))?;

        records_url
            .path_segments_mut()
            .map_err(|_| anyhow!("Airtable API URL cannot be a base: {}", api_url))?
            .pop_if_empty()
            .push(base_id)
            .push(table_name);

        Ok(Self {
            http,
            records_url,
            token,
        })
    }

    /// Endpoint records are created at.
    pub fn records_url(&self) -> &Url {
        &self.records_url
    }

    /// Create one record and return Airtable's response body.
    pub async fn create_record(&self, record: &OutboundRecord) -> Result<Value, UpstreamError> {
        let request = CreateRecordsRequest {
            records: [RecordEnvelope { fields: record }],
        };

        info!(url = %self.records_url, "airtable_write_starting");

        let response = self
            .http
            .post(self.records_url.clone())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| write_error(e, None))?;

        let status = response.status();
        if !status.is_success() {
            let body = body_text(response).await;
            error!(
                status_code = status.as_u16(),
                body = %body,
                "airtable_write_failed"
            );
            return Err(UpstreamError::StoreWriteFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| write_error(e, Some(status.as_u16())))?;

        let data = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) => Value::String(body),
        };

        info!(
            status_code = status.as_u16(),
            record_id = ?created_record_id(&data),
            "airtable_write_complete"
        );

        Ok(data)
    }
}

fn write_error(e: reqwest::Error, status: Option<u16>) -> UpstreamError {
    if e.is_timeout() {
        error!(error = %e, "airtable_write_timeout");
        UpstreamError::Timeout { target: "airtable" }
    } else {
        error!(error = %e, "airtable_write_request_error");
        UpstreamError::StoreWriteFailed {
            status,
            body: e.to_string(),
        }
    }
}

/// Id of the first record in a create response.
pub fn created_record_id(response: &Value) -> Option<String> {
    response
        .get("records")?
        .get(0)?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

impl std::fmt::Debug for AirtableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableClient")
            .field("records_url", &self.records_url.as_str())
            .field("token", &"<REDACTED>")
            .finish()
    }
}
