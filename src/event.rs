//! Normalized event records and the builder that assembles them.
//!
//! Every event, whether it comes from a captured error, an ad-hoc message
//! or a direct alert, passes through [`EventBuilder`] so the collector
//! always receives the same shape. Events are immutable once built.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use uuid::Uuid;

use crate::alert::AlertRequest;
use crate::breadcrumb::Breadcrumb;
use crate::config::Config;
use crate::context::{ContextSnapshot, User};
use crate::error::ClientError;
use crate::fingerprint;
use crate::severity::Severity;

/// What produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Error,
    Message,
    Alert,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Error => "error",
            EventKind::Message => "message",
            EventKind::Alert => "alert",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured description of a failure's origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// Type name of the error
    pub kind: String,

    /// Display text of the error
    pub message: String,

    /// `file:line:column` where the error was captured
    pub location: String,

    /// Display text of each `source()` in the chain, outermost first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ErrorInfo {
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            location: location.into(),
            causes: Vec::new(),
        }
    }

    /// Describe `error`, using the caller's location as the top location.
    #[track_caller]
    pub fn from_error<E: StdError + ?Sized>(error: &E) -> Self {
        let location = Location::caller();
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            kind: error_kind(error),
            message: error.to_string(),
            location: format_location(location),
            causes,
        }
    }

    /// Replace the derived kind, e.g. with a domain-specific error code.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Last path segment of the kind, without generics.
    pub fn short_kind(&self) -> &str {
        let base = self.kind.split('<').next().unwrap_or(&self.kind);
        base.rsplit("::").next().unwrap_or(base)
    }
}

/// Type name of `E`, or for trait objects the concrete kind read from the
/// leading identifier of the `Debug` output (`ParseIntError { .. }`).
fn error_kind<E: StdError + ?Sized>(error: &E) -> String {
    let static_name = std::any::type_name::<E>();
    if !static_name.contains("dyn ") {
        return static_name.to_string();
    }

    let debug = format!("{:?}", error);
    let ident: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        static_name.to_string()
    } else {
        ident
    }
}

pub(crate) fn format_location(location: &Location<'_>) -> String {
    format!(
        "{}:{}:{}",
        location.file(),
        location.line(),
        location.column()
    )
}

/// Per-capture options for errors and messages.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Severity override (errors default to `error`)
    pub level: Option<Severity>,

    /// Explicit grouping, e.g. `["checkout", "payment-failed"]`
    pub fingerprint: Option<Vec<String>>,

    /// Arbitrary structured payload
    pub extra: Map<String, Value>,
}

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }

    pub fn fingerprint<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fingerprint = Some(parts.into_iter().map(Into::into).collect());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Context and breadcrumbs copied at capture time.
#[derive(Debug, Clone, Default)]
pub struct ScopeSnapshot {
    pub context: ContextSnapshot,
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// An immutable event ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    event_id: Uuid,
    kind: EventKind,
    severity: Severity,
    title: String,
    message: String,
    fingerprint: Vec<String>,
    group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
    extra: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    contexts: BTreeMap<String, Value>,
    breadcrumbs: Vec<Breadcrumb>,
    environment: String,
    release: String,
    timestamp: DateTime<Utc>,
}

impl Event {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fingerprint(&self) -> &[String] {
        &self.fingerprint
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn contexts(&self) -> &BTreeMap<String, Value> {
        &self.contexts
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Assembles events from errors, messages and alert requests.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    environment: String,
    release: String,
}

impl EventBuilder {
    pub fn new(environment: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            release: release.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.environment.clone(), config.release.clone())
    }

    /// Build an event for a captured error. Severity defaults to `error`.
    pub fn build_from_error(
        &self,
        error: ErrorInfo,
        options: CaptureOptions,
        scope: ScopeSnapshot,
    ) -> Event {
        let derived = fingerprint::error_fingerprint(&error.kind, &error.location);
        let title = error.short_kind().to_string();
        let message = error.message.clone();

        self.assemble(Draft {
            kind: EventKind::Error,
            severity: options.level.unwrap_or(Severity::Error),
            title,
            message,
            fingerprint: fingerprint::resolve(options.fingerprint, derived),
            error: Some(error),
            extra: options.extra,
            scope,
        })
    }

    /// Build an event for an ad-hoc message.
    pub fn build_from_message(
        &self,
        text: &str,
        level: Severity,
        options: CaptureOptions,
        scope: ScopeSnapshot,
    ) -> Event {
        let derived = fingerprint::title_fingerprint(text, EventKind::Message.as_str());

        self.assemble(Draft {
            kind: EventKind::Message,
            severity: level,
            title: text.to_string(),
            message: text.to_string(),
            fingerprint: fingerprint::resolve(options.fingerprint, derived),
            error: None,
            extra: options.extra,
            scope,
        })
    }

    /// Build an event for a direct alert.
    ///
    /// Breadcrumbs in `scope` are discarded unless the request asks for them.
    pub fn build_from_alert(
        &self,
        request: AlertRequest,
        mut scope: ScopeSnapshot,
    ) -> Result<Event, ClientError> {
        if request.title.trim().is_empty() {
            return Err(ClientError::MissingField("title"));
        }
        if !request.include_breadcrumbs {
            scope.breadcrumbs.clear();
        }

        let derived = fingerprint::title_fingerprint(&request.title, EventKind::Alert.as_str());

        Ok(self.assemble(Draft {
            kind: EventKind::Alert,
            severity: request.priority.unwrap_or_default(),
            title: request.title,
            message: request.message,
            fingerprint: fingerprint::resolve(request.fingerprint, derived),
            error: None,
            extra: request.fields,
            scope,
        }))
    }

    fn assemble(&self, draft: Draft) -> Event {
        let group_id = fingerprint::group_id(&draft.fingerprint);
        Event {
            event_id: Uuid::new_v4(),
            kind: draft.kind,
            severity: draft.severity,
            title: draft.title,
            message: draft.message,
            fingerprint: draft.fingerprint,
            group_id,
            error: draft.error,
            extra: draft.extra,
            user: draft.scope.context.user,
            contexts: draft.scope.context.contexts,
            breadcrumbs: draft.scope.breadcrumbs,
            environment: self.environment.clone(),
            release: self.release.clone(),
            timestamp: Utc::now(),
        }
    }
}

struct Draft {
    kind: EventKind,
    severity: Severity,
    title: String,
    message: String,
    fingerprint: Vec<String>,
    error: Option<ErrorInfo>,
    extra: Map<String, Value>,
    scope: ScopeSnapshot,
}
