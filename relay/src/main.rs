//! Foxy Relay - webhook receiver that writes Foxy events to Airtable.
//!
//! This binary:
//! - Receives Foxy webhooks (JSON or `FoxyData` form posts)
//! - Verifies the HMAC signature when a secret is configured
//! - Creates one Airtable record per accepted webhook
//! - Answers with the outcome of that single write

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use foxrelay::upstream::build_http_client;
use foxrelay::{router, AppState, Config, Relay};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        airtable_base_set = !config.airtable_base_id.is_empty(),
        airtable_table = %config.airtable_table_name,
        airtable_token_set = !config.airtable_token.is_empty(),
        signature_verification = config.foxy_webhook_secret.is_some(),
        fetch_subscriptions = config.fetch_linked_subscriptions,
        foxy_api_url = %config.foxy_api_url,
        record_layout = %config.record_layout,
        "config_loaded"
    );

    let missing = config.missing_required();
    if !missing.is_empty() {
        bail!("Missing required configuration: {}", missing.join(", "));
    }

    // One HTTP client for both outbound services
    let http = build_http_client(Duration::from_millis(config.request_timeout_ms))?;
    let relay = Relay::from_config(&config, http).context("Failed to build relay")?;
    info!(
        verifies_signatures = relay.verifies_signatures(),
        fetches_subscriptions = relay.fetches_subscriptions(),
        "relay_created"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, relay));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
