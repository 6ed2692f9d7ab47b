//! Configuration module for environment variable parsing.
//!
//! Everything the relay needs is read once at startup; nothing is re-read
//! per request.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::mapping::RecordLayout;

/// Default Airtable REST root.
pub const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// Default Foxy hypermedia API root; only links on this origin are followed.
pub const DEFAULT_FOXY_API_URL: &str = "https://api.foxycart.com";

/// Header Foxy uses for the hex HMAC-SHA256 of the request body.
pub const DEFAULT_SIGNATURE_HEADER: &str = "Foxy-Webhook-Signature";

/// Form field Foxy uses for the legacy XML/JSON datafeed.
pub const DEFAULT_FORM_FIELD: &str = "FoxyData";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Airtable REST root, overridable for testing
    pub airtable_api_url: String,

    /// Airtable base identifier (`app...`)
    pub airtable_base_id: String,

    /// Airtable table name, percent-encoded when building the URL
    pub airtable_table_name: String,

    /// Airtable personal access token
    pub airtable_token: String,

    /// Shared secret for webhook HMAC verification; `None` disables the check
    pub foxy_webhook_secret: Option<String>,

    /// Name of the header carrying the signature
    pub signature_header: String,

    /// Form field holding the embedded JSON payload
    pub form_field: String,

    /// Foxy API root; subscription links on any other origin are refused
    pub foxy_api_url: String,

    /// Bearer token for the Foxy hypermedia API
    pub foxy_access_token: Option<String>,

    /// Value sent as `FOXY-API-VERSION`
    pub foxy_api_version: String,

    /// Whether subscription links are followed with a secondary fetch
    pub fetch_linked_subscriptions: bool,

    /// Which set of fields is written to the table
    pub record_layout: RecordLayout,

    /// Include the decoded payload as a `RawPayload` field
    pub echo_raw_payload: bool,

    /// Include Airtable's response body in the acknowledgment
    pub echo_store_response: bool,

    /// Timeout for each outbound HTTP call, in milliseconds
    pub request_timeout_ms: u64,

    /// Maximum accepted request body size
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            airtable_api_url: env::var("AIRTABLE_API_URL")
                .unwrap_or_else(|_| DEFAULT_AIRTABLE_API_URL.to_string()),

            airtable_base_id: env::var("AIRTABLE_BASE_ID").unwrap_or_default(),

            airtable_table_name: env::var("AIRTABLE_TABLE_NAME").unwrap_or_default(),

            airtable_token: env::var("AIRTABLE_TOKEN").unwrap_or_default(),

            foxy_webhook_secret: non_empty("FOXY_WEBHOOK_SECRET"),

            signature_header: env::var("FOXY_SIGNATURE_HEADER")
                .unwrap_or_else(|_| DEFAULT_SIGNATURE_HEADER.to_string()),

            form_field: env::var("FOXY_FORM_FIELD")
                .unwrap_or_else(|_| DEFAULT_FORM_FIELD.to_string()),

            foxy_api_url: env::var("FOXY_API_URL")
                .unwrap_or_else(|_| DEFAULT_FOXY_API_URL.to_string()),

            foxy_access_token: non_empty("FOXY_ACCESS_TOKEN"),

            foxy_api_version: env::var("FOXY_API_VERSION").unwrap_or_else(|_| "1".to_string()),

            fetch_linked_subscriptions: parse_bool("FOXY_FETCH_SUBSCRIPTIONS", false),

            record_layout: parse_or("RECORD_LAYOUT", RecordLayout::Subscription),

            echo_raw_payload: parse_bool("ECHO_RAW_PAYLOAD", false),

            echo_store_response: parse_bool("ECHO_STORE_RESPONSE", true),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 8000),

            max_body_bytes: parse_or("MAX_BODY_BYTES", 1024 * 1024),
        }
    }

    /// Names of required settings that are unset or inconsistent.
    ///
    /// An empty result means the relay can start.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.airtable_base_id.trim().is_empty() {
            missing.push("AIRTABLE_BASE_ID");
        }
        if self.airtable_table_name.trim().is_empty() {
            missing.push("AIRTABLE_TABLE_NAME");
        }
        if self.airtable_token.trim().is_empty() {
            missing.push("AIRTABLE_TOKEN");
        }
        if self.fetch_linked_subscriptions && self.foxy_access_token.is_none() {
            missing.push("FOXY_ACCESS_TOKEN");
        }

        missing
    }
}

/// Parse a variable with `FromStr`, warning and falling back on bad input.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
