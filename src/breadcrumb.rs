//! Bounded trail of diagnostic breadcrumbs.
//!
//! Breadcrumbs are appended in order and the oldest is evicted once the
//! trail reaches capacity. Normalization never fails: a breadcrumb with
//! missing fields is kept with defaults rather than lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

use crate::severity::Severity;

/// Default number of breadcrumbs retained.
pub const DEFAULT_BREADCRUMB_CAPACITY: usize = 100;

/// A normalized breadcrumb as stored in the trail and attached to events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// Category tag, e.g. "user", "transaction", "system"
    #[serde(rename = "type")]
    pub kind: String,

    /// Free-form subtype, e.g. "auth", "cart"
    pub category: String,

    pub message: String,

    pub level: Severity,

    /// Structured payload
    pub data: Value,

    pub timestamp: DateTime<Utc>,
}

/// A breadcrumb as supplied by the host. Every field is optional.
///
/// Loose JSON deserializes into this type, so host code that builds
/// breadcrumbs dynamically can pass them straight through.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BreadcrumbEntry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub message: Option<String>,
    pub level: Option<Severity>,
    pub data: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl BreadcrumbEntry {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Fill in defaults for every missing field.
    pub fn normalize(self) -> Breadcrumb {
        Breadcrumb {
            kind: self.kind.unwrap_or_else(|| "default".to_string()),
            category: self.category.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
            level: self.level.unwrap_or_default(),
            data: self.data.unwrap_or_else(|| Value::Object(Map::new())),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

impl From<BreadcrumbEntry> for Breadcrumb {
    fn from(entry: BreadcrumbEntry) -> Self {
        entry.normalize()
    }
}

/// Fixed-capacity FIFO of breadcrumbs.
#[derive(Debug)]
pub struct BreadcrumbTrail {
    entries: VecDeque<Breadcrumb>,
    capacity: usize,
    evicted: u64,
}

impl BreadcrumbTrail {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_BREADCRUMB_CAPACITY)),
            capacity,
            evicted: 0,
        }
    }

    /// Normalize and append an entry, evicting the oldest when full.
    pub fn add(&mut self, entry: impl Into<Breadcrumb>) {
        if self.capacity == 0 {
            self.evicted += 1;
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(entry.into());
    }

    /// Copy of the trail, oldest first.
    pub fn snapshot(&self) -> Vec<Breadcrumb> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of breadcrumbs pushed out of the trail so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

impl Default for BreadcrumbTrail {
    fn default() -> Self {
        Self::new(DEFAULT_BREADCRUMB_CAPACITY)
    }
}
