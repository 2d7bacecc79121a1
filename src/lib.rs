//! Alertline client library
//!
//! An in-process capture-and-forward client for application alerts:
//!
//! - **context**: current user and named context buckets
//! - **breadcrumb**: bounded trail of recent diagnostic steps
//! - **event**: immutable events built from errors, messages and alerts
//! - **fingerprint**: grouping keys and optional local rate limits
//! - **queue** / **pipeline**: bounded delivery queue with batching and retry
//! - **transport**: HTTP transmission to the collector
//! - **client** / **alert**: the handle the host application uses
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use alertline::{AlertRequest, BreadcrumbEntry, CaptureOptions, Client, Config, Severity, User};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = Client::new(config)?;
//!     client.install_panic_hook();
//!     let flusher = client.spawn_flusher();
//!
//!     client.set_user(User::new("user-123").with_plan("premium"));
//!     client.add_breadcrumb(BreadcrumbEntry::new("navigation", "Opened checkout"));
//!
//!     let outcome = client
//!         .critical(AlertRequest::new("Payment Failed", "Gateway timed out").with_field("orderId", "ORD-1"))
//!         .await?;
//!     println!("alert outcome: {:?}", outcome);
//!
//!     client.capture_message("Checkout slow", Severity::Warning, CaptureOptions::new());
//!
//!     client.shutdown(Duration::from_secs(5)).await;
//!     flusher.await?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod alert;
pub mod breadcrumb;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod pipeline;
pub mod queue;
pub mod severity;
mod sync;
pub mod transport;

// Re-export commonly used types at crate root for convenience
pub use alert::AlertRequest;
pub use breadcrumb::{Breadcrumb, BreadcrumbEntry, BreadcrumbTrail};
pub use client::Client;
pub use config::{Config, ConfigError, RetryPolicy};
pub use context::{ContextSnapshot, ContextStore, User};
pub use error::{ClientError, TransportError};
pub use event::{CaptureOptions, ErrorInfo, Event, EventBuilder, EventKind, ScopeSnapshot};
pub use fingerprint::{RateLimit, RateLimiter, SuppressionPolicy};
pub use pipeline::{DeliveryFailure, DeliveryPipeline, DeliveryStats, Enqueued};
pub use queue::{DeliveryOutcome, DeliveryReceipt, DeliveryState, DropReason};
pub use severity::Severity;
pub use transport::{EventBatch, HttpTransport, Transport};
