//! Alertline demo - sends sample alerts and captured events to a collector
//!
//! Plays the part of a host application: records context and breadcrumbs,
//! sends one alert per severity, captures an error and a message, then
//! shuts the client down with a bounded final flush.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `ALERTLINE_API_KEY`: Workspace API key (required)
//! - `ALERTLINE_ENDPOINT`: Collector URL (default: http://localhost:8787)
//! - `ALERTLINE_ENVIRONMENT`: Environment name (default: development)
//! - `ALERTLINE_BATCH_SIZE`: Events per batch (default: 20)
//! - `ALERTLINE_FLUSH_INTERVAL_SECS`: Seconds between background flushes (default: 5)
//! - `ALERTLINE_MAX_ATTEMPTS`: Delivery attempts per event (default: 5)
//! - `RUST_LOG`: Logging level filter (default: info)

use std::io;
use std::time::Duration;

use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use alertline::{
    AlertRequest, BreadcrumbEntry, CaptureOptions, Client, Config, DeliveryOutcome, Severity, User,
};

/// Upper bound on the final flush at shutdown
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with environment filter
    init_tracing();

    info!("Starting Alertline demo...");

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => {
            info!(
                endpoint = %config.endpoint,
                environment = %config.environment,
                batch_size = config.batch_size,
                flush_interval_secs = config.flush_interval.as_secs(),
                max_attempts = config.retry.max_attempts,
                "Configuration loaded"
            );
            config
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let client = match Client::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create HTTP client");
            std::process::exit(1);
        }
    };

    client.install_panic_hook();
    let flusher = client.spawn_flusher();

    let mut failures = client.subscribe_failures();
    let failure_logger = tokio::spawn(async move {
        while let Ok(failure) = failures.recv().await {
            warn!(
                event_id = %failure.event_id,
                title = %failure.title,
                reason = %failure.reason,
                "Alert could not be delivered"
            );
        }
    });

    // Run the demo until it completes or Ctrl+C arrives
    tokio::select! {
        _ = run_demo(&client) => {
            info!("Demo completed");
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Shutdown signal received, stopping..."),
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
        }
    }

    // Graceful shutdown
    info!("Initiating graceful shutdown...");
    client.shutdown(SHUTDOWN_DEADLINE).await;

    match tokio::time::timeout(SHUTDOWN_DEADLINE, flusher).await {
        Ok(Ok(())) => info!("Flusher shut down gracefully"),
        Ok(Err(e)) => warn!(error = %e, "Flusher panicked during shutdown"),
        Err(_) => warn!("Flusher shutdown timed out after {:?}", SHUTDOWN_DEADLINE),
    }
    failure_logger.abort();

    let stats = client.stats();
    info!(
        accepted = stats.accepted,
        delivered = stats.delivered,
        dropped = stats.dropped,
        retries = stats.retries,
        batches_sent = stats.batches_sent,
        "Alertline demo stopped"
    );
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Simulated host application activity.
async fn run_demo(client: &Client) {
    client.set_user(
        User::new("user-123")
            .with_email("user@example.com")
            .with_username("johndoe")
            .with_plan("premium"),
    );
    if let Err(e) = client.set_context("session", json!({ "cartItems": 3, "currency": "USD" })) {
        warn!(error = %e, "Failed to set context");
    }

    client.add_breadcrumb(
        BreadcrumbEntry::new("navigation", "Opened checkout page")
            .category("ui")
            .data(json!({ "from": "/cart", "to": "/checkout" })),
    );

    let first = AlertRequest::new(
        "Test Alert from Alertline",
        "Verifying that alerts reach the collector",
    )
    .with_priority(Severity::Info)
    .with_field("workspace", "development");
    report("alert", client.alert(first).await);

    report("info", client.info(("Application started", "Demo app is running")).await);
    report("warning", client.warning(("High memory usage", "Memory usage at 75%")).await);
    report(
        "error",
        client
            .error(("Failed to connect to database", "Connection timeout after 30s"))
            .await,
    );
    report(
        "critical",
        client
            .critical(("System is down!", "Complete service failure detected"))
            .await,
    );

    let err = io::Error::new(io::ErrorKind::TimedOut, "payment gateway timed out");
    let enqueued = client.capture_error(
        &err,
        CaptureOptions::new()
            .level(Severity::Critical)
            .fingerprint(["checkout", "payment-timeout"])
            .extra("orderId", "ORD-1001"),
    );
    info!(event_id = %enqueued.event_id(), accepted = enqueued.is_accepted(), "Error captured");

    let enqueued = client.capture_message(
        "Checkout completed slowly",
        Severity::Warning,
        CaptureOptions::new().extra("duration_ms", 4200),
    );
    info!(event_id = %enqueued.event_id(), accepted = enqueued.is_accepted(), "Message captured");

    client.flush().await;
}

fn report(kind: &str, result: Result<DeliveryOutcome, alertline::ClientError>) {
    match result {
        Ok(DeliveryOutcome::Delivered) => info!(kind = kind, "Alert delivered"),
        Ok(DeliveryOutcome::Dropped(reason)) => warn!(kind = kind, reason = %reason, "Alert dropped"),
        Err(e) => error!(kind = kind, error = %e, "Alert rejected"),
    }
}
