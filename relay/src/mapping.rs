//! Field mapping from a decoded Foxy payload to an Airtable record.
//!
//! The configured [`RecordLayout`] decides which fields are extracted.
//! Every field has a default, so missing optional data never aborts a
//! request.
//!
//! ## Resolution Flow
//!
//! ```text
//! payload → resolve() → Ready(fields)         → build_record()
//!                     → NeedsFetch { href }   → fields_from_fetched() → build_record()
//!                     → Skip                  (benign no-op)
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Number, Value};
use tracing::info;

/// Fallback for unknown names, products and statuses.
pub const UNKNOWN: &str = "unknown";

/// Fallback for unknown email addresses.
pub const NO_EMAIL: &str = "no-email";

/// Which set of fields is written to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Customer + subscription, from embedded or linked resources
    Subscription,
    /// Flat transaction object from the `FoxyData` datafeed
    Transaction,
    /// Bare `name` / `email` pair
    Contact,
}

impl RecordLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordLayout::Subscription => "subscription",
            RecordLayout::Transaction => "transaction",
            RecordLayout::Contact => "contact",
        }
    }
}

impl fmt::Display for RecordLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subscription" => Ok(RecordLayout::Subscription),
            "transaction" => Ok(RecordLayout::Transaction),
            "contact" => Ok(RecordLayout::Contact),
            other => Err(format!("unknown record layout `{}`", other)),
        }
    }
}

// =============================================================================
// Record Types
// =============================================================================

/// Fields written for the subscription layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionFields {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Price")]
    pub price: Number,
    #[serde(rename = "SubscriptionID", skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

/// Fields written for the transaction layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionFields {
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    #[serde(rename = "CustomerEmail")]
    pub customer_email: String,
    #[serde(rename = "Total")]
    pub total: Number,
    #[serde(rename = "Status")]
    pub status: String,
}

/// Fields written for the contact layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactFields {
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Layout-specific part of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordFields {
    Subscription(SubscriptionFields),
    Transaction(TransactionFields),
    Contact(ContactFields),
}

/// The record written to the store, serialized as Airtable's `fields` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundRecord {
    #[serde(flatten)]
    pub fields: RecordFields,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "RawPayload", skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<String>,
}

/// Outcome of looking for the data a layout needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Everything was inline
    Ready(RecordFields),
    /// The subscription is only linked and must be fetched
    NeedsFetch { href: String },
    /// Nothing to record
    Skip { reason: &'static str },
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve the fields for `layout` from a decoded payload.
pub fn resolve(layout: RecordLayout, payload: &Value) -> Resolution {
    match layout {
        RecordLayout::Subscription => resolve_subscription(payload),
        RecordLayout::Transaction => Resolution::Ready(RecordFields::Transaction(transaction_fields(payload))),
        RecordLayout::Contact => Resolution::Ready(RecordFields::Contact(contact_fields(payload))),
    }
}

fn resolve_subscription(payload: &Value) -> Resolution {
    if let Some(subscription) = embedded(payload, "subscription") {
        info!(source = "embedded", "mapping_subscription_resolved");
        let customer = embedded(payload, "customer");
        return Resolution::Ready(RecordFields::Subscription(subscription_fields(
            customer,
            subscription,
        )));
    }

    if let Some(href) = link(payload, "fx:subscription") {
        info!(href = %href, "mapping_subscription_linked");
        return Resolution::NeedsFetch { href };
    }

    info!("mapping_subscription_absent");
    Resolution::Skip {
        reason: "no subscription found in payload",
    }
}

/// Build subscription fields once a linked subscription has been fetched.
///
/// The customer comes from the original payload when embedded there,
/// otherwise from the fetched subscription's own embedded resources.
pub fn fields_from_fetched(payload: &Value, fetched: &Value) -> RecordFields {
    let customer = embedded(payload, "customer").or_else(|| embedded(fetched, "customer"));
    RecordFields::Subscription(subscription_fields(customer, fetched))
}

/// Attach the timestamp and optional payload echo.
pub fn build_record(
    fields: RecordFields,
    payload: &Value,
    now: DateTime<Utc>,
    echo_raw_payload: bool,
) -> OutboundRecord {
    OutboundRecord {
        fields,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        raw_payload: echo_raw_payload.then(|| payload.to_string()),
    }
}

// =============================================================================
// Layout Extractors
// =============================================================================

fn subscription_fields(customer: Option<&Value>, subscription: &Value) -> SubscriptionFields {
    let item = first_item(subscription);

    let product = text(subscription.get("item_name"))
        .or_else(|| item.and_then(|i| text(i.get("name"))))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let price = number(subscription.get("price"))
        .or_else(|| item.and_then(|i| number(i.get("price"))))
        .or_else(|| {
            embedded(subscription, "transaction_template")
                .and_then(|t| number(t.get("total_order")))
        })
        .unwrap_or_else(zero);

    SubscriptionFields {
        name: customer.and_then(customer_name).unwrap_or_else(|| UNKNOWN.to_string()),
        email: customer
            .and_then(|c| text(c.get("email")))
            .unwrap_or_else(|| NO_EMAIL.to_string()),
        product,
        price,
        subscription_id: text(subscription.get("id")),
    }
}

fn transaction_fields(payload: &Value) -> TransactionFields {
    TransactionFields {
        transaction_id: text(payload.get("id")).unwrap_or_else(|| UNKNOWN.to_string()),
        customer_email: text(payload.get("customer_email"))
            .unwrap_or_else(|| NO_EMAIL.to_string()),
        total: number(payload.get("total_order")).unwrap_or_else(zero),
        status: text(payload.get("status")).unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

fn contact_fields(payload: &Value) -> ContactFields {
    ContactFields {
        email: text(payload.get("email")).unwrap_or_else(|| NO_EMAIL.to_string()),
        name: text(payload.get("name")).unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

/// "First Last", either half alone, or a plain `name`.
fn customer_name(customer: &Value) -> Option<String> {
    let parts: Vec<String> = [customer.get("first_name"), customer.get("last_name")]
        .into_iter()
        .filter_map(text)
        .collect();

    if parts.is_empty() {
        text(customer.get("name"))
    } else {
        Some(parts.join(" "))
    }
}

// =============================================================================
// Hypermedia Helpers
// =============================================================================

/// Find an embedded resource by short name.
///
/// Looks in `_embedded` under `fx:<name>` then `<name>`, then at the top
/// level under `<name>`.
fn embedded<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    let namespaced = format!("fx:{}", name);
    let resources = value.get("_embedded");

    resources
        .and_then(|r| r.get(&namespaced))
        .or_else(|| resources.and_then(|r| r.get(name)))
        .or_else(|| value.get(name))
        .filter(|v| v.is_object())
}

/// `_links[rel].href`, when present and non-empty.
fn link(value: &Value, rel: &str) -> Option<String> {
    value
        .get("_links")
        .and_then(|links| links.get(rel))
        .and_then(|l| text(l.get("href")))
}

/// First line item of a subscription, directly or via its transaction template.
fn first_item(subscription: &Value) -> Option<&Value> {
    embedded_items(subscription).or_else(|| {
        embedded(subscription, "transaction_template").and_then(embedded_items)
    })
}

fn embedded_items(value: &Value) -> Option<&Value> {
    value
        .get("_embedded")
        .and_then(|e| e.get("fx:items"))
        .and_then(|items| items.as_array())
        .and_then(|items| items.first())
}

// =============================================================================
// Scalar Helpers
// =============================================================================

/// Non-empty string or a number rendered as text.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A JSON number, or a string that parses as one.
fn number(value: Option<&Value>) -> Option<Number> {
    match value? {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
        }
        _ => None,
    }
}

fn zero() -> Number {
    Number::from(0)
}
