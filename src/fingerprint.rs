//! Fingerprinting and optional local suppression of repeated events.
//!
//! A fingerprint is an ordered list of strings naming "the same" problem.
//! Callers may supply one; otherwise it is derived from the error kind and
//! top location, or from the title and category for non-error events.
//! Duplicates are still delivered unless a rate limit is configured for
//! their severity.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::severity::Severity;

/// Checks between automatic sweeps of elapsed windows.
const PRUNE_EVERY: u64 = 256;

/// Derive the fingerprint for an error from its kind and top location.
pub fn error_fingerprint(kind: &str, location: &str) -> Vec<String> {
    vec![kind.to_string(), location.to_string()]
}

/// Derive the fingerprint for a message or alert.
pub fn title_fingerprint(title: &str, category: &str) -> Vec<String> {
    vec![title.to_string(), category.to_string()]
}

/// Use the caller's override when it has any parts, else the derived value.
pub fn resolve(override_parts: Option<Vec<String>>, derived: Vec<String>) -> Vec<String> {
    match override_parts {
        Some(parts) if !parts.is_empty() => parts,
        _ => derived,
    }
}

/// Stable group identifier for a fingerprint: hex SHA-256 of its parts.
///
/// Parts are length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn group_id(parts: &[String]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Maximum events per group allowed inside one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_events: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn new(max_events: u32, window: Duration) -> Self {
        Self { max_events, window }
    }
}

/// Per-severity rate limits. Empty by default, i.e. nothing is suppressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionPolicy {
    limits: HashMap<Severity, RateLimit>,
}

impl SuppressionPolicy {
    /// Policy that never suppresses.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, severity: Severity, limit: RateLimit) -> Self {
        self.limits.insert(severity, limit);
        self
    }

    pub fn limit_for(&self, severity: Severity) -> Option<RateLimit> {
        self.limits.get(&severity).copied()
    }

    pub fn is_enabled(&self) -> bool {
        !self.limits.is_empty()
    }
}

#[derive(Debug)]
struct WindowCount {
    started: Instant,
    count: u32,
}

/// Fixed-window counter keyed by severity and group id.
#[derive(Debug, Default)]
pub struct RateLimiter {
    policy: SuppressionPolicy,
    windows: HashMap<(Severity, String), WindowCount>,
    checks: u64,
}

impl RateLimiter {
    pub fn new(policy: SuppressionPolicy) -> Self {
        Self {
            policy,
            windows: HashMap::new(),
            checks: 0,
        }
    }

    /// Record one occurrence and report whether it may be delivered.
    pub fn check(&mut self, severity: Severity, group_id: &str, now: Instant) -> bool {
        let Some(limit) = self.policy.limit_for(severity) else {
            return true;
        };

        self.checks += 1;
        if self.checks % PRUNE_EVERY == 0 {
            self.prune(now);
        }

        let window = self
            .windows
            .entry((severity, group_id.to_string()))
            .or_insert(WindowCount {
                started: now,
                count: 0,
            });

        if now.duration_since(window.started) >= limit.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= limit.max_events {
            return false;
        }
        window.count += 1;
        true
    }

    /// Forget windows that have fully elapsed.
    pub fn prune(&mut self, now: Instant) {
        let policy = &self.policy;
        self.windows.retain(|(severity, _), window| {
            policy
                .limit_for(*severity)
                .is_some_and(|limit| now.duration_since(window.started) < limit.window)
        });
    }

    pub fn tracked_groups(&self) -> usize {
        self.windows.len()
    }
}
