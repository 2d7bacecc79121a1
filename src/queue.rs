//! Bounded in-memory queue of events awaiting delivery.
//!
//! Items keep enqueue order. When the queue is full, the oldest item of the
//! lowest severity that is not currently being sent makes room for the
//! newcomer; if the newcomer itself has the lowest severity it is refused.
//! A newcomer that outranks an item still being sent is admitted past
//! capacity rather than refused.
//! Severity therefore decides what is shed under pressure, never the order
//! in which items are transmitted.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use crate::event::Event;
use crate::severity::Severity;

/// Lifecycle of a queued item.
///
/// `Delivered` and `Dropped` are terminal; items in those states have
/// already left the queue and only appear in outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Sending,
    Retrying,
    Delivered,
    Dropped,
}

/// Why an event was not delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The queue was full and the new event had the lowest severity
    QueueFull,
    /// Displaced from a full queue by a newer event
    Evicted,
    /// The collector refused the batch (4xx-class); not retried
    Rejected { status: Option<u16>, message: String },
    /// Transient failures persisted through every attempt
    RetriesExhausted { attempts: u32, last_error: String },
    /// Held back by a local rate limit
    Suppressed,
    /// The client shut down before delivery
    Shutdown,
}

impl DropReason {
    /// Terminal delivery failures are published to failure subscribers.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(
            self,
            DropReason::Rejected { .. } | DropReason::RetriesExhausted { .. }
        )
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::QueueFull => write!(f, "delivery queue is full"),
            DropReason::Evicted => write!(f, "evicted by a newer event"),
            DropReason::Rejected { status, message } => match status {
                Some(code) => write!(f, "rejected by collector (HTTP {}): {}", code, message),
                None => write!(f, "rejected: {}", message),
            },
            DropReason::RetriesExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "all {} attempts failed. Last error: {}",
                attempts, last_error
            ),
            DropReason::Suppressed => write!(f, "suppressed by rate limit"),
            DropReason::Shutdown => write!(f, "client shut down"),
        }
    }
}

/// Final result for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Dropped(DropReason),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Resolves once the event reaches `Delivered` or `Dropped`.
#[derive(Debug)]
pub struct DeliveryReceipt {
    event_id: Uuid,
    rx: oneshot::Receiver<DeliveryOutcome>,
}

impl DeliveryReceipt {
    pub(crate) fn new(event_id: Uuid, rx: oneshot::Receiver<DeliveryOutcome>) -> Self {
        Self { event_id, rx }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }
}

impl Future for DeliveryReceipt {
    type Output = DeliveryOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A vanished sender means the queue was torn down with the item in it
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(DeliveryOutcome::Dropped(DropReason::Shutdown)))
    }
}

/// An event plus its delivery bookkeeping.
#[derive(Debug)]
pub struct QueueItem {
    seq: u64,
    event: Event,
    attempt: u32,
    enqueued_at: Instant,
    next_retry_at: Option<Instant>,
    state: DeliveryState,
    last_error: Option<String>,
    notifier: Option<oneshot::Sender<DeliveryOutcome>>,
}

impl QueueItem {
    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    pub fn next_retry_at(&self) -> Option<Instant> {
        self.next_retry_at
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn severity(&self) -> Severity {
        self.event.severity()
    }

    fn is_evictable(&self) -> bool {
        matches!(self.state, DeliveryState::Pending | DeliveryState::Retrying)
    }

    fn is_due(&self, now: Instant) -> bool {
        match self.state {
            DeliveryState::Pending => true,
            DeliveryState::Retrying => self.next_retry_at.map_or(true, |at| at <= now),
            _ => false,
        }
    }

    /// Settle the item and wake whoever holds its receipt.
    pub(crate) fn resolve(&mut self, outcome: DeliveryOutcome) {
        self.state = match outcome {
            DeliveryOutcome::Delivered => DeliveryState::Delivered,
            DeliveryOutcome::Dropped(_) => DeliveryState::Dropped,
        };
        if let Some(tx) = self.notifier.take() {
            // The receipt may have been dropped; nobody is waiting then
            let _ = tx.send(outcome);
        }
    }
}

/// Result of offering an event to the queue.
#[derive(Debug)]
pub enum Admission {
    /// The event was queued, possibly displacing an older one
    Accepted { evicted: Option<QueueItem> },
    /// The queue was full and the event was refused
    Rejected(Event),
}

/// One item selected for transmission.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub seq: u64,
    pub event: Event,
}

#[derive(Debug)]
pub struct DeliveryQueue {
    items: VecDeque<QueueItem>,
    capacity: usize,
    next_seq: u64,
}

impl DeliveryQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(1_024)),
            capacity,
            next_seq: 0,
        }
    }

    /// Offer an event, applying the eviction policy when full.
    pub fn push(
        &mut self,
        event: Event,
        notifier: Option<oneshot::Sender<DeliveryOutcome>>,
        now: Instant,
    ) -> Admission {
        let mut evicted = None;

        if self.items.len() >= self.capacity {
            let victim = self.eviction_candidate();
            match victim {
                Some(idx) if self.items[idx].severity() <= event.severity() => {
                    evicted = self.items.remove(idx);
                }
                // Lower-severity items are only in flight: admit over
                // capacity, the overshoot is bounded by the batch in flight
                _ if self.has_lower_in_flight(event.severity()) => {}
                _ => return Admission::Rejected(event),
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(QueueItem {
            seq,
            event,
            attempt: 0,
            enqueued_at: now,
            next_retry_at: None,
            state: DeliveryState::Pending,
            last_error: None,
            notifier,
        });

        Admission::Accepted { evicted }
    }

    /// Oldest item among those with the lowest severity, skipping in-flight items.
    fn eviction_candidate(&self) -> Option<usize> {
        let mut best: Option<(usize, Severity)> = None;
        for (idx, item) in self.items.iter().enumerate() {
            if !item.is_evictable() {
                continue;
            }
            match best {
                Some((_, severity)) if item.severity() >= severity => {}
                _ => best = Some((idx, item.severity())),
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn has_lower_in_flight(&self, severity: Severity) -> bool {
        self.items
            .iter()
            .any(|item| item.state == DeliveryState::Sending && item.severity() < severity)
    }

    /// Mark up to `max` due items as sending, in enqueue order.
    pub fn take_due(&mut self, now: Instant, max: usize) -> Vec<Outbound> {
        let mut batch = Vec::new();
        for item in self.items.iter_mut() {
            if batch.len() >= max {
                break;
            }
            if item.is_due(now) {
                item.state = DeliveryState::Sending;
                item.attempt += 1;
                item.next_retry_at = None;
                batch.push(Outbound {
                    seq: item.seq,
                    event: item.event.clone(),
                });
            }
        }
        batch
    }

    /// Remove an item, e.g. once delivered or dropped.
    pub fn remove(&mut self, seq: u64) -> Option<QueueItem> {
        let idx = self.position(seq)?;
        self.items.remove(idx)
    }

    /// Attempts made so far for an item.
    pub fn attempt_of(&self, seq: u64) -> Option<u32> {
        self.position(seq).map(|idx| self.items[idx].attempt)
    }

    /// Move a sending item to retrying, due at `at`.
    pub fn schedule_retry(&mut self, seq: u64, at: Instant, last_error: String) -> bool {
        let Some(idx) = self.position(seq) else {
            return false;
        };
        let item = &mut self.items[idx];
        item.state = DeliveryState::Retrying;
        item.next_retry_at = Some(at);
        item.last_error = Some(last_error);
        true
    }

    /// Undo a send that was abandoned before it completed.
    ///
    /// The attempt is not counted and the item is due again immediately.
    pub fn abandon(&mut self, seq: u64, now: Instant) {
        if let Some(idx) = self.position(seq) {
            let item = &mut self.items[idx];
            if item.state != DeliveryState::Sending {
                return;
            }
            item.attempt = item.attempt.saturating_sub(1);
            if item.attempt == 0 {
                item.state = DeliveryState::Pending;
                item.next_retry_at = None;
            } else {
                item.state = DeliveryState::Retrying;
                item.next_retry_at = Some(now);
            }
        }
    }

    /// Earliest scheduled retry among retrying items.
    pub fn next_retry_at(&self) -> Option<Instant> {
        self.items
            .iter()
            .filter(|item| item.state == DeliveryState::Retrying)
            .filter_map(|item| item.next_retry_at)
            .min()
    }

    /// Items still waiting to be sent (pending or retrying).
    pub fn outstanding(&self) -> usize {
        self.items.iter().filter(|item| item.is_evictable()).count()
    }

    /// Remove every item.
    pub fn drain_all(&mut self) -> Vec<QueueItem> {
        self.items.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn position(&self, seq: u64) -> Option<usize> {
        self.items.iter().position(|item| item.seq == seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CaptureOptions, EventBuilder, ScopeSnapshot};
    use std::time::Duration;

    fn event(title: &str, severity: Severity) -> Event {
        EventBuilder::new("test", "1.0.0").build_from_message(
            title,
            severity,
            CaptureOptions::new(),
            ScopeSnapshot::default(),
        )
    }

    fn titles(queue: &DeliveryQueue) -> Vec<String> {
        queue.iter().map(|i| i.event().title().to_string()).collect()
    }

    #[test]
    fn test_full_queue_of_equal_severity_drops_oldest() {
        let mut queue = DeliveryQueue::new(3);
        let now = Instant::now();
        for title in ["A", "B", "C"] {
            assert!(matches!(
                queue.push(event(title, Severity::Info), None, now),
                Admission::Accepted { evicted: None }
            ));
        }

        match queue.push(event("D", Severity::Info), None, now) {
            Admission::Accepted { evicted: Some(item) } => assert_eq!(item.event().title(), "A"),
            other => panic!("expected eviction, got {:?}", other),
        }
        assert_eq!(titles(&queue), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_lowest_severity_evicted_first() {
        let mut queue = DeliveryQueue::new(3);
        let now = Instant::now();
        queue.push(event("crit", Severity::Critical), None, now);
        queue.push(event("info", Severity::Info), None, now);
        queue.push(event("warn", Severity::Warning), None, now);

        match queue.push(event("err", Severity::Error), None, now) {
            Admission::Accepted { evicted: Some(item) } => assert_eq!(item.event().title(), "info"),
            other => panic!("expected eviction, got {:?}", other),
        }
        assert_eq!(titles(&queue), vec!["crit", "warn", "err"]);
    }

    #[test]
    fn test_new_lowest_severity_is_rejected() {
        let mut queue = DeliveryQueue::new(2);
        let now = Instant::now();
        queue.push(event("a", Severity::Error), None, now);
        queue.push(event("b", Severity::Critical), None, now);

        match queue.push(event("noise", Severity::Debug), None, now) {
            Admission::Rejected(rejected) => assert_eq!(rejected.title(), "noise"),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(titles(&queue), vec!["a", "b"]);
    }

    #[test]
    fn test_critical_survives_while_info_queued() {
        let mut queue = DeliveryQueue::new(2);
        let now = Instant::now();
        queue.push(event("crit", Severity::Critical), None, now);
        queue.push(event("info", Severity::Info), None, now);

        for i in 0..10 {
            queue.push(event(&format!("info-{}", i), Severity::Info), None, now);
            assert!(queue.iter().any(|item| item.event().title() == "crit"));
        }
    }

    #[test]
    fn test_critical_admitted_over_lower_in_flight() {
        let mut queue = DeliveryQueue::new(1);
        let now = Instant::now();
        queue.push(event("sending", Severity::Info), None, now);
        assert_eq!(queue.take_due(now, 10).len(), 1);

        // The in-flight item is neither evicted nor allowed to block it
        assert!(matches!(
            queue.push(event("new", Severity::Critical), None, now),
            Admission::Accepted { evicted: None }
        ));
        assert_eq!(titles(&queue), vec!["sending", "new"]);
        assert_eq!(queue.outstanding(), 1);
    }

    #[test]
    fn test_equal_severity_in_flight_still_rejects() {
        let mut queue = DeliveryQueue::new(1);
        let now = Instant::now();
        queue.push(event("sending", Severity::Error), None, now);
        queue.take_due(now, 10);

        assert!(matches!(
            queue.push(event("new", Severity::Error), None, now),
            Admission::Rejected(_)
        ));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_take_due_respects_order_and_batch_size() {
        let mut queue = DeliveryQueue::new(10);
        let now = Instant::now();
        queue.push(event("first", Severity::Info), None, now);
        queue.push(event("second", Severity::Critical), None, now);
        queue.push(event("third", Severity::Debug), None, now);

        let batch = queue.take_due(now, 2);
        let batch_titles: Vec<&str> = batch.iter().map(|o| o.event.title()).collect();
        assert_eq!(batch_titles, vec!["first", "second"]);
        assert_eq!(queue.attempt_of(batch[0].seq), Some(1));
        assert_eq!(queue.outstanding(), 1);
    }

    #[test]
    fn test_retry_becomes_due_after_delay() {
        let mut queue = DeliveryQueue::new(10);
        let now = Instant::now();
        queue.push(event("a", Severity::Info), None, now);
        let seq = queue.take_due(now, 10)[0].seq;

        let at = now + Duration::from_millis(100);
        assert!(queue.schedule_retry(seq, at, "HTTP 500".to_string()));
        assert_eq!(queue.next_retry_at(), Some(at));
        assert!(queue.take_due(now, 10).is_empty());

        let batch = queue.take_due(at, 10);
        assert_eq!(batch.len(), 1);
        assert_eq!(queue.attempt_of(seq), Some(2));
    }

    #[test]
    fn test_abandon_restores_item() {
        let mut queue = DeliveryQueue::new(10);
        let now = Instant::now();
        queue.push(event("a", Severity::Info), None, now);
        let seq = queue.take_due(now, 10)[0].seq;

        queue.abandon(seq, now);
        let item = queue.iter().next().unwrap();
        assert_eq!(item.state(), DeliveryState::Pending);
        assert_eq!(item.attempt(), 0);
    }

    #[tokio::test]
    async fn test_resolve_wakes_receipt() {
        let mut queue = DeliveryQueue::new(10);
        let now = Instant::now();
        let ev = event("a", Severity::Info);
        let event_id = ev.event_id();
        let (tx, rx) = oneshot::channel();
        queue.push(ev, Some(tx), now);

        let receipt = DeliveryReceipt::new(event_id, rx);
        let seq = queue.take_due(now, 10)[0].seq;
        let mut item = queue.remove(seq).unwrap();
        item.resolve(DeliveryOutcome::Delivered);

        assert_eq!(receipt.event_id(), event_id);
        assert_eq!(receipt.await, DeliveryOutcome::Delivered);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_sender_resolves_as_shutdown() {
        let mut queue = DeliveryQueue::new(10);
        let ev = event("a", Severity::Info);
        let event_id = ev.event_id();
        let (tx, rx) = oneshot::channel();
        queue.push(ev, Some(tx), Instant::now());
        drop(queue);

        let outcome = DeliveryReceipt::new(event_id, rx).await;
        assert_eq!(outcome, DeliveryOutcome::Dropped(DropReason::Shutdown));
    }

    #[test]
    fn test_drop_reason_display() {
        let reason = DropReason::RetriesExhausted {
            attempts: 3,
            last_error: "Connection refused".to_string(),
        };
        assert!(reason.to_string().contains("3"));
        assert!(reason.to_string().contains("Connection refused"));
        assert!(reason.is_delivery_failure());
        assert!(!DropReason::Evicted.is_delivery_failure());
    }
}
