//! The webhook relay pipeline.
//!
//! ```text
//! Request → read_request() → verify signature → decode() → resolve()
//!         → (fetch subscription) → build_record() → Airtable create → outcome
//! ```
//!
//! A `Relay` is built once at startup and shared by every request. It holds
//! no per-request state; each call to [`Relay::handle`] is independent and
//! any failure ends the request without retries.

use anyhow::Result;
use axum::{extract::Request, http::Method};
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{DecodeError, RelayError};
use crate::ingress::{self, RawRequest};
use crate::mapping::{self, RecordLayout, Resolution};
use crate::upstream::{airtable::created_record_id, AirtableClient, FoxyClient};
use crate::web::signature::SignatureVerifier;

/// Result of a request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// A record was written
    Created {
        record_id: Option<String>,
        response: Value,
    },
    /// Nothing needed writing
    Ignored { reason: &'static str },
}

/// Webhook-to-Airtable pipeline with its policy and clients.
#[derive(Debug, Clone)]
pub struct Relay {
    form_field: String,
    max_body_bytes: usize,
    layout: RecordLayout,
    echo_raw_payload: bool,
    verifier: Option<SignatureVerifier>,
    foxy: Option<FoxyClient>,
    airtable: AirtableClient,
}

impl Relay {
    /// Build the pipeline from configuration and a shared HTTP client.
    ///
    /// The Foxy client only exists when subscription fetching is enabled.
    pub fn from_config(config: &Config, http: Client) -> Result<Self> {
        let verifier =
            SignatureVerifier::from_config(&config.foxy_webhook_secret, &config.signature_header);

        let foxy = match (&config.foxy_access_token, config.fetch_linked_subscriptions) {
            (Some(token), true) => Some(FoxyClient::new(
                http.clone(),
                &config.foxy_api_url,
                token.clone(),
                config.foxy_api_version.clone(),
            )?),
            _ => None,
        };

        let airtable = AirtableClient::new(
            http,
            &config.airtable_api_url,
            &config.airtable_base_id,
            &config.airtable_table_name,
            config.airtable_token.clone(),
        )?;

        Ok(Self {
            form_field: config.form_field.clone(),
            max_body_bytes: config.max_body_bytes,
            layout: config.record_layout,
            echo_raw_payload: config.echo_raw_payload,
            verifier,
            foxy,
            airtable,
        })
    }

    pub fn verifies_signatures(&self) -> bool {
        self.verifier.is_some()
    }

    pub fn fetches_subscriptions(&self) -> bool {
        self.foxy.is_some()
    }

    /// Run one HTTP request through the pipeline.
    pub async fn handle(&self, request: Request) -> Result<RelayOutcome, RelayError> {
        let raw = ingress::read_request(request, self.max_body_bytes).await?;
        self.process(&raw).await
    }

    /// Run an already-captured request through the pipeline.
    ///
    /// The signature is checked against the raw bytes before anything is
    /// parsed.
    pub async fn process(&self, raw: &RawRequest) -> Result<RelayOutcome, RelayError> {
        if raw.method != Method::POST {
            return Err(DecodeError::MethodNotAllowed(raw.method.to_string()).into());
        }

        if let Some(verifier) = &self.verifier {
            verifier.check(raw)?;
            info!(header = %verifier.header(), "signature_verified");
        }

        let event = ingress::decode(raw, &self.form_field).await?;

        info!(
            decode_path = event.path.as_str(),
            event = ?event.event,
            layout = self.layout.as_str(),
            "relay_event_decoded"
        );

        let fields = match mapping::resolve(self.layout, &event.payload) {
            Resolution::Ready(fields) => fields,
            Resolution::NeedsFetch { href } => match &self.foxy {
                Some(foxy) => {
                    let subscription = foxy.fetch_subscription(&href).await?;
                    mapping::fields_from_fetched(&event.payload, &subscription)
                }
                None => {
                    warn!(href = %href, "relay_subscription_fetch_disabled");
                    return Ok(RelayOutcome::Ignored {
                        reason: "subscription is linked but fetching is disabled",
                    });
                }
            },
            Resolution::Skip { reason } => {
                info!(reason = reason, "relay_event_ignored");
                return Ok(RelayOutcome::Ignored { reason });
            }
        };

        let record =
            mapping::build_record(fields, &event.payload, Utc::now(), self.echo_raw_payload);

        let response = self.airtable.create_record(&record).await?;
        let record_id = created_record_id(&response);

        info!(record_id = ?record_id, "relay_record_created");

        Ok(RelayOutcome::Created {
            record_id,
            response,
        })
    }
}
