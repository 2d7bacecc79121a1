//! One-call alert surface.
//!
//! `alert`, `info`, `warning`, `error` and `critical` build a single event,
//! queue it and resolve once that event is delivered or dropped. Requests
//! come either as an [`AlertRequest`] or as a `(title, message)` pair.

use serde_json::{Map, Value};
use tracing::debug;

use crate::client::Client;
use crate::error::ClientError;
use crate::pipeline::Enqueued;
use crate::queue::DeliveryOutcome;
use crate::severity::Severity;

/// A direct alert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertRequest {
    pub title: String,
    pub message: String,

    /// Severity; `info` when unset
    pub priority: Option<Severity>,

    /// Free-form fields sent as the event's `extra`
    pub fields: Map<String, Value>,

    /// Grouping override
    pub fingerprint: Option<Vec<String>>,

    /// Attach the breadcrumb trail (off by default)
    pub include_breadcrumbs: bool,
}

impl AlertRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Severity) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the priority by name.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidSeverity` for an unknown name.
    pub fn with_priority_name(self, priority: &str) -> Result<Self, ClientError> {
        Ok(self.with_priority(priority.parse()?))
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_fingerprint<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fingerprint = Some(parts.into_iter().map(Into::into).collect());
        self
    }

    pub fn include_breadcrumbs(mut self, include: bool) -> Self {
        self.include_breadcrumbs = include;
        self
    }

    /// Build a request from a loose JSON object.
    ///
    /// `title`, `message`, `priority` (or `severity`), `fingerprint` and
    /// `include_breadcrumbs` are recognised; every other key becomes a field.
    ///
    /// # Errors
    ///
    /// Fails with `MissingField("title")` when the title is absent or not a
    /// string, and with `InvalidSeverity` for an unknown priority.
    pub fn from_value(value: Value) -> Result<Self, ClientError> {
        let Value::Object(mut object) = value else {
            return Err(ClientError::MissingField("title"));
        };

        let title = match object.remove("title") {
            Some(Value::String(title)) => title,
            _ => return Err(ClientError::MissingField("title")),
        };
        let message = match object.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let mut request = AlertRequest::new(title, message);

        let priority = object.remove("priority").or_else(|| object.remove("severity"));
        if let Some(priority) = priority {
            let name = match &priority {
                Value::String(name) => name.clone(),
                other => other.to_string(),
            };
            request = request.with_priority_name(&name)?;
        }

        if let Some(Value::Array(parts)) = object.remove("fingerprint") {
            request = request.with_fingerprint(parts.into_iter().map(|part| match part {
                Value::String(s) => s,
                other => other.to_string(),
            }));
        }

        if let Some(include) = object.remove("include_breadcrumbs") {
            request.include_breadcrumbs = include.as_bool().unwrap_or(false);
        }

        request.fields = object;
        Ok(request)
    }
}

impl From<&str> for AlertRequest {
    fn from(title: &str) -> Self {
        AlertRequest::new(title, "")
    }
}

impl From<(&str, &str)> for AlertRequest {
    fn from((title, message): (&str, &str)) -> Self {
        AlertRequest::new(title, message)
    }
}

impl From<(String, String)> for AlertRequest {
    fn from((title, message): (String, String)) -> Self {
        AlertRequest::new(title, message)
    }
}

impl Client {
    /// Queue an alert without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MissingField` when the title is blank.
    pub fn send_alert(&self, request: impl Into<AlertRequest>) -> Result<Enqueued, ClientError> {
        let request = request.into();
        let scope = self.scope_snapshot(request.include_breadcrumbs);
        let event = self.builder().build_from_alert(request, scope)?;
        Ok(self.submit(event))
    }

    /// Send an alert and wait until it is delivered or dropped.
    ///
    /// A flush is started in the background so the alert goes out even
    /// without a running flusher. Must be called within a tokio runtime.
    pub async fn alert(
        &self,
        request: impl Into<AlertRequest>,
    ) -> Result<DeliveryOutcome, ClientError> {
        let enqueued = self.send_alert(request)?;

        if let Enqueued::Accepted { event_id, .. } = &enqueued {
            debug!(event_id = %event_id, "Alert queued, flushing");
            let client = self.clone();
            tokio::spawn(async move { client.flush().await });
        }

        Ok(enqueued.outcome().await)
    }

    pub async fn info(
        &self,
        request: impl Into<AlertRequest>,
    ) -> Result<DeliveryOutcome, ClientError> {
        self.alert(request.into().with_priority(Severity::Info)).await
    }

    pub async fn warning(
        &self,
        request: impl Into<AlertRequest>,
    ) -> Result<DeliveryOutcome, ClientError> {
        self.alert(request.into().with_priority(Severity::Warning))
            .await
    }

    pub async fn error(
        &self,
        request: impl Into<AlertRequest>,
    ) -> Result<DeliveryOutcome, ClientError> {
        self.alert(request.into().with_priority(Severity::Error)).await
    }

    pub async fn critical(
        &self,
        request: impl Into<AlertRequest>,
    ) -> Result<DeliveryOutcome, ClientError> {
        self.alert(request.into().with_priority(Severity::Critical))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breadcrumb::BreadcrumbEntry;
    use crate::client::tests::test_client;
    use crate::config::Config;
    use serde_json::json;

    fn config() -> Config {
        Config::new("test-key", "http://localhost:8787").with_auto_breadcrumbs(false)
    }

    #[test]
    fn test_from_value() {
        let request = AlertRequest::from_value(json!({
            "title": "Order Completed",
            "message": "Order ORD-1 completed",
            "priority": "warning",
            "orderId": "ORD-1",
            "total": 42.5
        }))
        .unwrap();

        assert_eq!(request.title, "Order Completed");
        assert_eq!(request.priority, Some(Severity::Warning));
        assert_eq!(request.fields["orderId"], "ORD-1");
        assert_eq!(request.fields.len(), 2);
    }

    #[test]
    fn test_from_value_errors() {
        assert_eq!(
            AlertRequest::from_value(json!({ "message": "no title" })),
            Err(ClientError::MissingField("title"))
        );
        assert_eq!(
            AlertRequest::from_value(json!({ "title": "t", "priority": "urgent" })),
            Err(ClientError::InvalidSeverity("urgent".to_string()))
        );
    }

    #[test]
    fn test_positional_forms() {
        let request: AlertRequest = ("Server Down", "db-1 unreachable").into();
        assert_eq!(request.title, "Server Down");
        assert_eq!(request.message, "db-1 unreachable");
        assert!(request.priority.is_none());
    }

    #[tokio::test]
    async fn test_severity_shorthands() {
        let (client, transport) = test_client(config());

        assert!(client.info(("a", "1")).await.unwrap().is_delivered());
        assert!(client.warning(("b", "2")).await.unwrap().is_delivered());
        assert!(client.error(("c", "3")).await.unwrap().is_delivered());
        assert!(client.critical(("d", "4")).await.unwrap().is_delivered());

        let severities: Vec<Severity> = transport.events().iter().map(|e| e.severity()).collect();
        assert_eq!(
            severities,
            vec![
                Severity::Info,
                Severity::Warning,
                Severity::Error,
                Severity::Critical
            ]
        );
    }

    #[tokio::test]
    async fn test_alert_skips_breadcrumbs_by_default() {
        let (client, transport) = test_client(config());
        client.add_breadcrumb(BreadcrumbEntry::new("ui", "clicked buy"));

        client.alert(("plain", "x")).await.unwrap();
        client
            .alert(AlertRequest::new("with trail", "x").include_breadcrumbs(true))
            .await
            .unwrap();

        let events = transport.events();
        assert!(events[0].breadcrumbs().is_empty());
        assert_eq!(events[1].breadcrumbs().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_title_fails_fast() {
        let (client, transport) = test_client(config());
        let result = client.critical(("   ", "body")).await;
        assert_eq!(result, Err(ClientError::MissingField("title")));
        assert_eq!(client.queued(), 0);
        assert!(transport.events().is_empty());
    }

    #[tokio::test]
    async fn test_alert_after_shutdown_is_dropped() {
        let (client, _) = test_client(config());
        client.shutdown(std::time::Duration::from_millis(10)).await;
        let outcome = client.alert("late").await.unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome::Dropped(crate::queue::DropReason::Shutdown)
        );
    }
}
