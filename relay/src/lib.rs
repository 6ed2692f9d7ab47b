//! Foxy → Airtable webhook relay.
//!
//! Receives Foxy webhooks, verifies and decodes them, maps a fixed set of
//! fields and creates one Airtable record per accepted request.
//!
//! ## Architecture
//!
//! ```text
//! Foxy → web (router, signature) → ingress (decode) → mapping → upstream (Foxy fetch, Airtable write)
//! ```
//!
//! Nothing is persisted and no state is shared between requests; the
//! source platform's own webhook retries are the only redelivery mechanism.

pub mod config;
pub mod error;
pub mod ingress;
pub mod mapping;
pub mod relay;
pub mod upstream;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{AuthError, DecodeError, RelayError, UpstreamError};
pub use ingress::{decode, read_request, DecodePath, NormalizedEvent, RawRequest};
pub use mapping::{OutboundRecord, RecordLayout};
pub use relay::{Relay, RelayOutcome};
pub use web::{router, AppState};
