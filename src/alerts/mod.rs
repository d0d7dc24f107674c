//! Inbound alert adapter.
//!
//! Translates an Alertmanager webhook notification into a ticket request. Only the
//! first alert of a notification is turned into a ticket; the full payload is kept
//! for the ticket description.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::ticketing::TicketRequest;

pub const DEFAULT_ALERT_NAME: &str = "Unknown Alert";
pub const DEFAULT_ALERT_STATUS: &str = "unknown";
pub const DEFAULT_SEVERITY: &str = "medium";
pub const DEFAULT_DESCRIPTION: &str = "No description";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlertError {
    #[error("no JSON data received")]
    Empty,

    #[error("malformed alert payload: {0}")]
    Malformed(String),
}

/// Alertmanager webhook notification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlertNotification {
    pub receiver: Option<String>,
    pub status: Option<String>,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Alert {
    pub status: Option<String>,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    #[serde(rename = "startsAt")]
    pub starts_at: Option<String>,
    #[serde(rename = "generatorURL")]
    pub generator_url: Option<String>,
}

/// The fields of an alert that end up in a ticket.
#[derive(Debug, Clone)]
pub struct AlertTicket {
    pub name: String,
    pub status: String,
    pub severity: String,
    pub description: String,
    pub summary: String,
    pub payload: Value,
}

impl AlertTicket {
    /// Map a raw webhook body, filling in defaults for anything missing.
    pub fn from_payload(payload: &Value) -> Result<Self, AlertError> {
        let is_empty = match payload {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if is_empty {
            return Err(AlertError::Empty);
        }

        let notification: AlertNotification = serde_json::from_value(payload.clone())
            .map_err(|e| AlertError::Malformed(e.to_string()))?;

        let first = notification.alerts.into_iter().next().unwrap_or_default();
        let label = |key: &str| first.labels.get(key).cloned();
        let annotation = |key: &str| first.annotations.get(key).cloned();

        let name = label("alertname").unwrap_or_else(|| DEFAULT_ALERT_NAME.to_string());
        let summary = annotation("summary").unwrap_or_else(|| name.clone());

        Ok(Self {
            status: first
                .status
                .clone()
                .unwrap_or_else(|| DEFAULT_ALERT_STATUS.to_string()),
            severity: label("severity").unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
            description: annotation("description").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            name,
            summary,
            payload: payload.clone(),
        })
    }

    /// Ticket priority derived from the severity label.
    pub fn priority(&self) -> &'static str {
        match self.severity.to_lowercase().as_str() {
            "critical" | "high" => "High",
            _ => "Medium",
        }
    }

    pub fn ticket_summary(&self) -> String {
        format!("[{}] {}", self.severity.to_uppercase(), self.summary)
    }

    pub fn labels(&self) -> Vec<String> {
        vec![
            "prometheus".to_string(),
            "alert".to_string(),
            self.severity.to_lowercase(),
        ]
    }

    pub fn into_request(self) -> TicketRequest {
        TicketRequest::Alert(self)
    }
}
