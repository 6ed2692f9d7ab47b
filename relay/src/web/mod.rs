//! Web server module for the Foxy webhook endpoint.
//!
//! This module provides:
//! - The router and shared state
//! - HMAC signature verification for inbound requests
//! - Health check and webhook handlers

pub mod handlers;
pub mod signature;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{foxy_webhook, health, AppState, HealthResponse, WebhookResponse};
pub use signature::{is_signature_verification_enabled, verify_signature, SignatureVerifier};

/// Path Foxy is configured to deliver webhooks to.
pub const WEBHOOK_PATH: &str = "/webhooks/foxy";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(WEBHOOK_PATH, any(foxy_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
