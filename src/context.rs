//! Process-wide context attached to every captured event.
//!
//! The store holds the current user and named context buckets. Reads go
//! through [`ContextStore::snapshot`], which deep-copies the state so an
//! event captured now is unaffected by later mutation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::ClientError;

/// Identity of the user the host is currently serving.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Subscription plan or tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    /// Any further host-defined attributes
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl User {
    /// Create a user with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    /// Attach an arbitrary attribute.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.other.insert(key.into(), value.into());
        self
    }
}

/// Copy of the context store taken at capture time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSnapshot {
    pub user: Option<User>,
    pub contexts: BTreeMap<String, Value>,
}

/// Mutable user and context state owned by one client.
#[derive(Debug, Default)]
pub struct ContextStore {
    user: Option<User>,
    contexts: BTreeMap<String, Value>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current user. `None` clears it.
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// Upsert a named context bucket, replacing any previous value.
    pub fn set_context(&mut self, name: &str, value: Value) -> Result<(), ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::EmptyContextName);
        }
        self.contexts.insert(name.to_string(), value);
        Ok(())
    }

    /// Remove a context bucket, returning its last value.
    pub fn remove_context(&mut self, name: &str) -> Option<Value> {
        self.contexts.remove(name)
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn context(&self, name: &str) -> Option<&Value> {
        self.contexts.get(name)
    }

    /// Drop the user and every context bucket.
    pub fn clear(&mut self) {
        self.user = None;
        self.contexts.clear();
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            user: self.user.clone(),
            contexts: self.contexts.clone(),
        }
    }
}
