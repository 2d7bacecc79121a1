//! Delivery pipeline: queueing, batching, transmission and retry.
//!
//! Each queued item moves through
//! `Pending -> Sending -> {Delivered | Retrying -> Sending | Dropped}`.
//! Enqueueing never suspends and never fails loudly; the caller gets an
//! [`Enqueued`] value saying whether the event was accepted. Only
//! transmission suspends, and only one transmission pass runs at a time so
//! batches leave in enqueue order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, RetryPolicy};
use crate::event::Event;
use crate::queue::{
    Admission, DeliveryOutcome, DeliveryQueue, DeliveryReceipt, DropReason, Outbound, QueueItem,
};
use crate::severity::Severity;
use crate::sync::lock;
use crate::transport::{EventBatch, Transport};

/// Capacity of the delivery-failure broadcast channel.
const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// Whether an event made it into the queue.
#[derive(Debug)]
pub enum Enqueued {
    /// Queued; the receipt resolves when delivery finishes either way
    Accepted {
        event_id: Uuid,
        receipt: DeliveryReceipt,
    },
    /// Not queued
    Dropped { event_id: Uuid, reason: DropReason },
}

impl Enqueued {
    pub fn event_id(&self) -> Uuid {
        match self {
            Enqueued::Accepted { event_id, .. } | Enqueued::Dropped { event_id, .. } => *event_id,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Enqueued::Accepted { .. })
    }

    /// Wait for the final outcome. Resolves immediately for dropped events.
    pub async fn outcome(self) -> DeliveryOutcome {
        match self {
            Enqueued::Accepted { receipt, .. } => receipt.await,
            Enqueued::Dropped { reason, .. } => DeliveryOutcome::Dropped(reason),
        }
    }
}

/// Published when an event is given up on after a delivery failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub event_id: Uuid,
    pub severity: Severity,
    pub title: String,
    pub group_id: String,
    pub reason: DropReason,
}

/// Statistics about pipeline operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Events accepted into the queue
    pub accepted: u64,

    /// Events delivered to the collector
    pub delivered: u64,

    /// Events dropped for any reason
    pub dropped: u64,

    /// Events displaced from a full queue
    pub evicted: u64,

    /// Events held back by a rate limit
    pub suppressed: u64,

    /// Retries scheduled after transient failures
    pub retries: u64,

    /// Batches accepted by the collector
    pub batches_sent: u64,

    /// Transmission attempts that failed
    pub failed_attempts: u64,
}

/// Compute the delay before retry number `attempt` (1-based).
///
/// Exponential backoff with jitter:
/// delay = min(base * 2^(attempt-1) + jitter, max_delay), jitter up to 25%.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy.base_delay.as_millis() as u64;
    let max = policy.max_delay.as_millis() as u64;

    let exponent = attempt.saturating_sub(1).min(16);
    let exponential = base.saturating_mul(1u64 << exponent);

    let jitter = if exponential == 0 {
        0
    } else {
        rand::random::<u64>() % (exponential / 4 + 1)
    };

    Duration::from_millis(exponential.saturating_add(jitter).min(max))
}

/// Puts sending items back if a transmission is abandoned mid-flight,
/// e.g. when a flush deadline cancels it.
struct InFlight<'a> {
    queue: &'a Mutex<DeliveryQueue>,
    seqs: Vec<u64>,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) -> Vec<u64> {
        self.armed = false;
        std::mem::take(&mut self.seqs)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let now = Instant::now();
        let mut queue = lock(self.queue);
        for seq in &self.seqs {
            queue.abandon(*seq, now);
        }
    }
}

/// Batching, retrying delivery of events to a [`Transport`].
pub struct DeliveryPipeline {
    queue: Mutex<DeliveryQueue>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    batch_size: usize,
    stats: Mutex<DeliveryStats>,
    failures: broadcast::Sender<DeliveryFailure>,
    send_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl DeliveryPipeline {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self::with_settings(
            transport,
            config.queue_capacity,
            config.batch_size,
            config.retry,
        )
    }

    pub fn with_settings(
        transport: Arc<dyn Transport>,
        queue_capacity: usize,
        batch_size: usize,
        retry: RetryPolicy,
    ) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            queue: Mutex::new(DeliveryQueue::new(queue_capacity)),
            transport,
            retry: RetryPolicy {
                max_attempts: retry.max_attempts.max(1),
                ..retry
            },
            batch_size: batch_size.max(1),
            stats: Mutex::new(DeliveryStats::default()),
            failures,
            send_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    /// Queue an event for delivery. Never suspends.
    pub fn enqueue(&self, event: Event) -> Enqueued {
        let event_id = event.event_id();
        let severity = event.severity();

        if self.is_closed() {
            self.count_dropped(false);
            return Enqueued::Dropped {
                event_id,
                reason: DropReason::Shutdown,
            };
        }

        let (tx, rx) = oneshot::channel();
        let admission = lock(&self.queue).push(event, Some(tx), Instant::now());

        match admission {
            Admission::Accepted { evicted } => {
                lock(&self.stats).accepted += 1;
                if let Some(item) = evicted {
                    warn!(
                        evicted_id = %item.event().event_id(),
                        evicted_severity = %item.event().severity(),
                        "Delivery queue full: evicting oldest lowest-severity event"
                    );
                    self.drop_item(item, DropReason::Evicted);
                }
                debug!(event_id = %event_id, severity = %severity, "Event queued");
                Enqueued::Accepted {
                    event_id,
                    receipt: DeliveryReceipt::new(event_id, rx),
                }
            }
            Admission::Rejected(_) => {
                warn!(
                    event_id = %event_id,
                    severity = %severity,
                    "Delivery queue full: dropping new event"
                );
                self.count_dropped(false);
                Enqueued::Dropped {
                    event_id,
                    reason: DropReason::QueueFull,
                }
            }
        }
    }

    /// Count an event that a rate limit kept out of the queue.
    pub fn record_suppressed(&self) {
        let mut stats = lock(&self.stats);
        stats.suppressed += 1;
        stats.dropped += 1;
    }

    /// Transmit every item that is due now, in batches. Does not wait for
    /// retries scheduled in the future. Returns the number of events sent.
    pub async fn send_due(&self) -> usize {
        let _guard = self.send_lock.lock().await;
        self.send_due_locked().await
    }

    /// Drain the queue: keep transmitting, waiting out backoff delays, until
    /// no pending or retrying item remains.
    ///
    /// Terminates because every item has a bounded number of attempts.
    pub async fn flush(&self) {
        let _guard = self.send_lock.lock().await;

        loop {
            self.send_due_locked().await;

            let next_retry = {
                let queue = lock(&self.queue);
                if queue.outstanding() == 0 {
                    break;
                }
                queue.next_retry_at()
            };

            // Nothing scheduled means new items arrived meanwhile; go again
            if let Some(at) = next_retry {
                tokio::time::sleep_until(at).await;
            }
        }
    }

    /// Like [`flush`](Self::flush) but gives up after `timeout`.
    /// Returns `true` if the queue drained in time.
    pub async fn flush_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.flush()).await.is_ok()
    }

    /// Stop accepting events, make a bounded final flush and drop whatever
    /// is left. Calling it again does nothing.
    pub async fn shutdown(&self, deadline: Duration) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);

        let drained = self.flush_timeout(deadline).await;
        let remaining = lock(&self.queue).drain_all();

        if drained {
            info!("Delivery pipeline shut down, queue drained");
        } else {
            warn!(
                remaining = remaining.len(),
                deadline_ms = deadline.as_millis() as u64,
                "Shutdown deadline elapsed, dropping undelivered events"
            );
        }

        for item in remaining {
            self.drop_item(item, DropReason::Shutdown);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Receiver that flips to `true` when shutdown begins.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Subscribe to terminal delivery failures.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<DeliveryFailure> {
        self.failures.subscribe()
    }

    pub fn stats(&self) -> DeliveryStats {
        lock(&self.stats).clone()
    }

    /// Number of items currently queued, including in-flight ones.
    pub fn queued(&self) -> usize {
        lock(&self.queue).len()
    }

    async fn send_due_locked(&self) -> usize {
        let mut sent = 0;
        loop {
            let batch = lock(&self.queue).take_due(Instant::now(), self.batch_size);
            if batch.is_empty() {
                break;
            }
            sent += batch.len();
            self.transmit(batch).await;
        }
        sent
    }

    async fn transmit(&self, outbound: Vec<Outbound>) {
        let (seqs, events): (Vec<u64>, Vec<Event>) =
            outbound.into_iter().map(|o| (o.seq, o.event)).unzip();
        let batch = EventBatch::new(events);
        let batch_size = batch.len();

        let in_flight = InFlight {
            queue: &self.queue,
            seqs,
            armed: true,
        };
        let result = self.transport.send(&batch).await;
        let seqs = in_flight.disarm();

        match result {
            Ok(()) => {
                let delivered: Vec<QueueItem> = {
                    let mut queue = lock(&self.queue);
                    seqs.iter().filter_map(|seq| queue.remove(*seq)).collect()
                };
                {
                    let mut stats = lock(&self.stats);
                    stats.batches_sent += 1;
                    stats.delivered += delivered.len() as u64;
                }
                for mut item in delivered {
                    item.resolve(DeliveryOutcome::Delivered);
                }
                info!(batch_size = batch_size, "Event batch delivered");
            }
            Err(e) if e.is_retryable() => {
                lock(&self.stats).failed_attempts += 1;
                let last_error = e.to_string();
                let now = Instant::now();

                let mut exhausted = Vec::new();
                let mut retried = 0u64;
                {
                    let mut queue = lock(&self.queue);
                    for seq in &seqs {
                        let Some(attempt) = queue.attempt_of(*seq) else {
                            continue;
                        };
                        if attempt >= self.retry.max_attempts {
                            if let Some(item) = queue.remove(*seq) {
                                exhausted.push((item, attempt));
                            }
                        } else {
                            let delay = backoff_delay(&self.retry, attempt);
                            queue.schedule_retry(*seq, now + delay, last_error.clone());
                            retried += 1;
                            debug!(
                                attempt = attempt,
                                max_attempts = self.retry.max_attempts,
                                delay_ms = delay.as_millis() as u64,
                                "Scheduled retry"
                            );
                        }
                    }
                }
                lock(&self.stats).retries += retried;

                warn!(
                    error = %e,
                    batch_size = batch_size,
                    retrying = retried,
                    exhausted = exhausted.len(),
                    "Batch delivery failed"
                );

                for (item, attempts) in exhausted {
                    self.drop_item(
                        item,
                        DropReason::RetriesExhausted {
                            attempts,
                            last_error: last_error.clone(),
                        },
                    );
                }
            }
            Err(e) => {
                lock(&self.stats).failed_attempts += 1;
                error!(
                    error = %e,
                    status = ?e.status(),
                    batch_size = batch_size,
                    "Batch rejected by collector, not retrying"
                );

                let rejected: Vec<QueueItem> = {
                    let mut queue = lock(&self.queue);
                    seqs.iter().filter_map(|seq| queue.remove(*seq)).collect()
                };
                let reason = DropReason::Rejected {
                    status: e.status(),
                    message: e.to_string(),
                };
                for item in rejected {
                    self.drop_item(item, reason.clone());
                }
            }
        }
    }

    fn count_dropped(&self, evicted: bool) {
        let mut stats = lock(&self.stats);
        stats.dropped += 1;
        if evicted {
            stats.evicted += 1;
        }
    }

    fn drop_item(&self, mut item: QueueItem, reason: DropReason) {
        self.count_dropped(reason == DropReason::Evicted);

        if reason.is_delivery_failure() {
            let event = item.event();
            error!(
                event_id = %event.event_id(),
                severity = %event.severity(),
                reason = %reason,
                "Event delivery failed"
            );
            // No subscribers is fine; the failure is still logged
            let _ = self.failures.send(DeliveryFailure {
                event_id: event.event_id(),
                severity: event.severity(),
                title: event.title().to_string(),
                group_id: event.group_id().to_string(),
                reason: reason.clone(),
            });
        }

        item.resolve(DeliveryOutcome::Dropped(reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::event::{CaptureOptions, EventBuilder, ScopeSnapshot};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, Copy)]
    enum Reply {
        Ok,
        Status(u16),
    }

    /// Transport that answers from a script and records what it was sent.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Reply>>,
        fallback: Reply,
        calls: AtomicUsize,
        sent: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedTransport {
        fn always(reply: Reply) -> Arc<Self> {
            Self::scripted(vec![], reply)
        }

        fn scripted(script: Vec<Reply>, fallback: Reply) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn sent_titles(&self) -> Vec<Vec<String>> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, batch: &EventBatch) -> Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sent
                .lock()
                .unwrap()
                .push(batch.events.iter().map(|e| e.title().to_string()).collect());

            let reply = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
            match reply {
                Reply::Ok => Ok(()),
                Reply::Status(status) => Err(TransportError::Status {
                    status,
                    message: format!("scripted {}", status),
                }),
            }
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn pipeline(transport: Arc<ScriptedTransport>, capacity: usize, batch: usize) -> DeliveryPipeline {
        DeliveryPipeline::with_settings(transport, capacity, batch, fast_retry(3))
    }

    fn event(title: &str, severity: Severity) -> Event {
        EventBuilder::new("test", "1.0.0").build_from_message(
            title,
            severity,
            CaptureOptions::new(),
            ScopeSnapshot::default(),
        )
    }

    #[test]
    fn test_backoff_delay_increases() {
        let policy = RetryPolicy::default();

        let delay1 = backoff_delay(&policy, 1);
        let delay2 = backoff_delay(&policy, 2);
        let delay3 = backoff_delay(&policy, 3);

        // Base delay is 500ms with up to 25% jitter
        assert!(delay1.as_millis() >= 500);
        assert!(delay1.as_millis() <= 625);
        assert!(delay2.as_millis() >= 1000);
        assert!(delay2.as_millis() <= 1250);
        assert!(delay3.as_millis() >= 2000);
        assert!(delay3.as_millis() <= 2500);
    }

    #[test]
    fn test_backoff_delay_caps_at_max() {
        let policy = RetryPolicy::default();
        let delay = backoff_delay(&policy, 30);
        assert!(delay <= policy.max_delay);
    }

    #[tokio::test]
    async fn test_flush_delivers_in_batches_preserving_order() {
        let transport = ScriptedTransport::always(Reply::Ok);
        let pipeline = pipeline(transport.clone(), 10, 2);

        let receipts: Vec<Enqueued> = ["a", "b", "c"]
            .iter()
            .map(|t| pipeline.enqueue(event(t, Severity::Info)))
            .collect();
        pipeline.flush().await;

        assert_eq!(
            transport.sent_titles(),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
        for enqueued in receipts {
            assert_eq!(enqueued.outcome().await, DeliveryOutcome::Delivered);
        }

        let stats = pipeline.stats();
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.delivered, 3);
        assert_eq!(stats.batches_sent, 2);
        assert_eq!(pipeline.queued(), 0);
    }

    #[tokio::test]
    async fn test_client_error_drops_after_one_attempt() {
        let transport = ScriptedTransport::always(Reply::Status(400));
        let pipeline = pipeline(transport.clone(), 10, 10);
        let mut failures = pipeline.subscribe_failures();

        let enqueued = pipeline.enqueue(event("bad", Severity::Error));
        let event_id = enqueued.event_id();
        pipeline.flush().await;

        assert_eq!(transport.calls(), 1);
        match enqueued.outcome().await {
            DeliveryOutcome::Dropped(DropReason::Rejected { status, .. }) => {
                assert_eq!(status, Some(400))
            }
            other => panic!("expected rejection, got {:?}", other),
        }

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.event_id, event_id);
        assert_eq!(failure.severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_server_error_retried_until_exhausted() {
        let transport = ScriptedTransport::always(Reply::Status(500));
        let pipeline = pipeline(transport.clone(), 10, 10);

        let enqueued = pipeline.enqueue(event("flaky", Severity::Warning));
        pipeline.flush().await;

        assert_eq!(transport.calls(), 3);
        match enqueued.outcome().await {
            DeliveryOutcome::Dropped(DropReason::RetriesExhausted { attempts, .. }) => {
                assert_eq!(attempts, 3)
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(pipeline.stats().retries, 2);
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let transport = ScriptedTransport::scripted(vec![Reply::Status(503)], Reply::Ok);
        let pipeline = pipeline(transport.clone(), 10, 10);

        let enqueued = pipeline.enqueue(event("eventually", Severity::Info));
        pipeline.flush().await;

        assert_eq!(transport.calls(), 2);
        assert_eq!(enqueued.outcome().await, DeliveryOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_lowest_new_event() {
        let transport = ScriptedTransport::always(Reply::Ok);
        let pipeline = pipeline(transport, 1, 10);

        assert!(pipeline.enqueue(event("crit", Severity::Critical)).is_accepted());
        match pipeline.enqueue(event("info", Severity::Info)) {
            Enqueued::Dropped { reason, .. } => assert_eq!(reason, DropReason::QueueFull),
            other => panic!("expected drop, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_evicted_receipt_resolves() {
        let transport = ScriptedTransport::always(Reply::Ok);
        let pipeline = pipeline(transport, 1, 10);

        let first = pipeline.enqueue(event("old", Severity::Info));
        let second = pipeline.enqueue(event("new", Severity::Error));

        assert!(second.is_accepted());
        assert_eq!(
            first.outcome().await,
            DeliveryOutcome::Dropped(DropReason::Evicted)
        );
        assert_eq!(pipeline.stats().evicted, 1);
    }

    #[tokio::test]
    async fn test_send_due_skips_future_retries() {
        let transport = ScriptedTransport::always(Reply::Status(500));
        let pipeline = DeliveryPipeline::with_settings(
            transport.clone(),
            10,
            10,
            RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_secs(60),
                max_delay: Duration::from_secs(60),
            },
        );

        pipeline.enqueue(event("later", Severity::Info));
        assert_eq!(pipeline.send_due().await, 1);
        assert_eq!(pipeline.send_due().await, 0);
        assert_eq!(transport.calls(), 1);
        assert_eq!(pipeline.queued(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drops_remaining_and_refuses_new() {
        let transport = ScriptedTransport::always(Reply::Status(500));
        let pipeline = DeliveryPipeline::with_settings(
            transport,
            10,
            10,
            RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_secs(60),
                max_delay: Duration::from_secs(60),
            },
        );
        let mut signal = pipeline.shutdown_signal();

        let pending = pipeline.enqueue(event("stuck", Severity::Error));
        pipeline.shutdown(Duration::from_millis(50)).await;

        assert!(*signal.borrow_and_update());
        assert_eq!(
            pending.outcome().await,
            DeliveryOutcome::Dropped(DropReason::Shutdown)
        );
        match pipeline.enqueue(event("late", Severity::Critical)) {
            Enqueued::Dropped { reason, .. } => assert_eq!(reason, DropReason::Shutdown),
            other => panic!("expected drop, got {:?}", other),
        }
        assert_eq!(pipeline.queued(), 0);

        // Idempotent
        pipeline.shutdown(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_record_suppressed_counts() {
        let pipeline = pipeline(ScriptedTransport::always(Reply::Ok), 10, 10);
        pipeline.record_suppressed();
        let stats = pipeline.stats();
        assert_eq!(stats.suppressed, 1);
        assert_eq!(stats.dropped, 1);
    }

    /// Transport that holds each send until released.
    struct GatedTransport {
        started: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn send(&self, _batch: &EventBatch) -> Result<(), TransportError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_critical_accepted_while_info_in_flight() {
        let transport = Arc::new(GatedTransport {
            started: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let pipeline = Arc::new(DeliveryPipeline::with_settings(
            transport.clone(),
            1,
            10,
            fast_retry(3),
        ));

        let info = pipeline.enqueue(event("routine", Severity::Info));
        let sender = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.send_due().await })
        };
        transport.started.notified().await;

        let critical = pipeline.enqueue(event("outage", Severity::Critical));
        assert!(critical.is_accepted());
        assert_eq!(pipeline.queued(), 2);

        // The same pass picks up the critical event in a second batch
        transport.release.notify_one();
        transport.started.notified().await;
        transport.release.notify_one();
        assert_eq!(sender.await.unwrap(), 2);

        assert_eq!(info.outcome().await, DeliveryOutcome::Delivered);
        assert_eq!(critical.outcome().await, DeliveryOutcome::Delivered);
        assert_eq!(pipeline.queued(), 0);
    }
}
