//! Client handle tying context, breadcrumbs and delivery together.
//!
//! A [`Client`] is constructed once by the host and cloned into every call
//! site; clones share the same state. All capture calls are synchronous and
//! only report whether the event was queued. Delivery happens on
//! [`Client::flush`], [`Client::send_due`] or the background flusher.

use std::error::Error as StdError;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::breadcrumb::{Breadcrumb, BreadcrumbEntry, BreadcrumbTrail};
use crate::config::Config;
use crate::context::{ContextStore, User};
use crate::error::{ClientError, TransportError};
use crate::event::{format_location, CaptureOptions, ErrorInfo, Event, EventBuilder, ScopeSnapshot};
use crate::fingerprint::RateLimiter;
use crate::pipeline::{DeliveryFailure, DeliveryPipeline, DeliveryStats, Enqueued};
use crate::queue::DropReason;
use crate::severity::Severity;
use crate::sync::{lock, read, write};
use crate::transport::{HttpTransport, Transport};

pub(crate) struct ClientInner {
    config: Arc<Config>,
    context: RwLock<ContextStore>,
    breadcrumbs: Mutex<BreadcrumbTrail>,
    builder: EventBuilder,
    limiter: Mutex<RateLimiter>,
    pipeline: DeliveryPipeline,
}

/// Shared handle to one alerting client.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a client delivering over HTTP to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::BuildHttpClient` if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client with a custom transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let pipeline = DeliveryPipeline::new(&config, transport);
        let inner = ClientInner {
            context: RwLock::new(ContextStore::new()),
            breadcrumbs: Mutex::new(BreadcrumbTrail::new(config.breadcrumb_capacity)),
            builder: EventBuilder::from_config(&config),
            limiter: Mutex::new(RateLimiter::new(config.suppression.clone())),
            pipeline,
            config: Arc::new(config),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Set or clear (`None`) the current user.
    pub fn set_user(&self, user: impl Into<Option<User>>) {
        write(&self.inner.context).set_user(user.into());
    }

    /// Upsert a named context bucket.
    pub fn set_context(&self, name: &str, value: impl Into<Value>) -> Result<(), ClientError> {
        write(&self.inner.context).set_context(name, value.into())
    }

    pub fn remove_context(&self, name: &str) -> Option<Value> {
        write(&self.inner.context).remove_context(name)
    }

    pub fn user(&self) -> Option<User> {
        read(&self.inner.context).user().cloned()
    }

    pub fn add_breadcrumb(&self, breadcrumb: impl Into<Breadcrumb>) {
        lock(&self.inner.breadcrumbs).add(breadcrumb);
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        lock(&self.inner.breadcrumbs).snapshot()
    }

    pub fn clear_breadcrumbs(&self) {
        lock(&self.inner.breadcrumbs).clear();
    }

    /// Capture an error. The call site becomes the error's top location.
    #[track_caller]
    pub fn capture_error<E>(&self, error: &E, options: CaptureOptions) -> Enqueued
    where
        E: StdError + ?Sized,
    {
        self.capture_error_info(ErrorInfo::from_error(error), options)
    }

    /// Capture an already described error.
    pub fn capture_error_info(&self, error: ErrorInfo, options: CaptureOptions) -> Enqueued {
        let event = self
            .inner
            .builder
            .build_from_error(error, options, self.scope_snapshot(true));
        self.submit(event)
    }

    /// Capture an ad-hoc message at the given level.
    pub fn capture_message(
        &self,
        text: &str,
        level: Severity,
        options: CaptureOptions,
    ) -> Enqueued {
        let event =
            self.inner
                .builder
                .build_from_message(text, level, options, self.scope_snapshot(true));
        self.submit(event)
    }

    /// Capture a message with the level given by name, e.g. `"warning"`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidSeverity` for an unknown level name.
    pub fn capture_message_named(
        &self,
        text: &str,
        level: &str,
        options: CaptureOptions,
    ) -> Result<Enqueued, ClientError> {
        let level: Severity = level.parse()?;
        Ok(self.capture_message(text, level, options))
    }

    /// Transmit everything due now without waiting for scheduled retries.
    pub async fn send_due(&self) -> usize {
        self.inner.pipeline.send_due().await
    }

    /// Deliver everything queued, waiting out retries.
    pub async fn flush(&self) {
        self.inner.pipeline.flush().await;
    }

    /// Flush with a deadline. Returns `true` if the queue drained in time.
    pub async fn flush_timeout(&self, timeout: Duration) -> bool {
        self.inner.pipeline.flush_timeout(timeout).await
    }

    /// Refuse new events, flush for at most `deadline`, drop the rest.
    pub async fn shutdown(&self, deadline: Duration) {
        self.inner.pipeline.shutdown(deadline).await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.pipeline.is_closed()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.inner.pipeline.stats()
    }

    /// Events waiting in the delivery queue, including in-flight ones.
    pub fn queued(&self) -> usize {
        self.inner.pipeline.queued()
    }

    /// Subscribe to events that failed delivery for good.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<DeliveryFailure> {
        self.inner.pipeline.subscribe_failures()
    }

    /// Spawn a task that sends due events every flush interval.
    ///
    /// The task exits once [`shutdown`](Self::shutdown) begins. Must be called
    /// from within a tokio runtime.
    pub fn spawn_flusher(&self) -> JoinHandle<()> {
        let client = self.clone();
        let flush_interval = self.inner.config.flush_interval;
        let mut shutdown = self.inner.pipeline.shutdown_signal();

        tokio::spawn(async move {
            let mut ticker = interval(flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Skip the first immediate tick
            ticker.tick().await;

            info!(
                flush_interval_secs = flush_interval.as_secs(),
                "Background flusher started"
            );

            loop {
                if *shutdown.borrow() {
                    break;
                }

                tokio::select! {
                    _ = ticker.tick() => {
                        let sent = client.send_due().await;
                        if sent > 0 {
                            debug!(sent = sent, "Time-based flush completed");
                        }
                        lock(&client.inner.limiter).prune(Instant::now());
                    }

                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            info!("Background flusher stopped");
        })
    }

    /// Capture panics as critical events, then run the previous hook.
    ///
    /// Does nothing and returns `false` when automatic error capture is
    /// disabled. The event is only queued; it goes out with the next flush.
    pub fn install_panic_hook(&self) -> bool {
        if !self.inner.config.auto_capture_errors {
            return false;
        }

        let weak: Weak<ClientInner> = Arc::downgrade(&self.inner);
        let previous = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            if let Some(inner) = weak.upgrade() {
                let payload = info.payload();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Box<dyn Any>".to_string());
                let location = info
                    .location()
                    .map(format_location)
                    .unwrap_or_else(|| "unknown".to_string());

                let client = Client { inner };
                client.capture_error_info(
                    ErrorInfo::new("panic", message, location),
                    CaptureOptions::new().level(Severity::Critical),
                );
            }
            previous(info);
        }));

        debug!("Panic hook installed");
        true
    }

    /// Apply local suppression, queue the event and record its breadcrumb.
    pub(crate) fn submit(&self, event: Event) -> Enqueued {
        let inner = &self.inner;

        let breadcrumb = inner.config.auto_breadcrumbs.then(|| {
            BreadcrumbEntry::new("event", event.title())
                .category(event.kind().as_str())
                .level(event.severity())
                .data(json!({ "event_id": event.event_id().to_string() }))
        });

        let allowed =
            lock(&inner.limiter).check(event.severity(), event.group_id(), Instant::now());

        let enqueued = if allowed {
            inner.pipeline.enqueue(event)
        } else {
            debug!(
                event_id = %event.event_id(),
                severity = %event.severity(),
                group_id = %event.group_id(),
                "Event suppressed by rate limit"
            );
            inner.pipeline.record_suppressed();
            Enqueued::Dropped {
                event_id: event.event_id(),
                reason: DropReason::Suppressed,
            }
        };

        if let Enqueued::Dropped { event_id, reason } = &enqueued {
            if *reason != DropReason::Suppressed {
                warn!(event_id = %event_id, reason = %reason, "Event not queued");
            }
        }

        if let Some(entry) = breadcrumb {
            lock(&inner.breadcrumbs).add(entry);
        }

        enqueued
    }

    pub(crate) fn builder(&self) -> &EventBuilder {
        &self.inner.builder
    }

    /// Copy context and, if asked, breadcrumbs for a new event.
    pub(crate) fn scope_snapshot(&self, with_breadcrumbs: bool) -> ScopeSnapshot {
        let context = read(&self.inner.context).snapshot();
        let breadcrumbs = if with_breadcrumbs {
            lock(&self.inner.breadcrumbs).snapshot()
        } else {
            Vec::new()
        };

        ScopeSnapshot {
            context,
            breadcrumbs,
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.config.endpoint)
            .field("environment", &self.inner.config.environment)
            .field("queued", &self.queued())
            .finish()
    }
}
