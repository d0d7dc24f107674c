//! Ticket requests, results and error definitions.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::alerts::AlertTicket;

/// What a ticket is being filed for.
#[derive(Debug, Clone)]
pub enum TicketRequest {
    /// A monitored endpoint failed its health check.
    EndpointDown {
        name: String,
        url: String,
        error_message: String,
    },
    /// An alert pushed through the webhook.
    Alert(AlertTicket),
}

impl TicketRequest {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TicketRequest::EndpointDown { .. } => "endpoint_down",
            TicketRequest::Alert(_) => "alert",
        }
    }
}

/// A ticket created in the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedTicket {
    pub key: String,
    pub url: String,
}

/// Errors that can occur while talking to the tracker.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Required connection settings are absent.
    #[error("ticketing is not configured (missing {})", .0.join(", "))]
    NotConfigured(Vec<&'static str>),

    /// The tracker answered with an unexpected status.
    #[error("Jira error: {status} - {body}")]
    Rejected { status: u16, body: String },

    /// The request never completed.
    #[error("Jira request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The tracker accepted the request but the body was unusable.
    #[error("unexpected Jira response: {0}")]
    InvalidResponse(String),

    #[error("no transition named '{0}' is available")]
    TransitionNotFound(String),
}

/// Result type for ticketing operations.
pub type TicketResult<T> = Result<T, TicketError>;

/// Files tickets in an external tracker.
#[async_trait]
pub trait TicketFiler: Send + Sync {
    async fn file_ticket(&self, request: &TicketRequest) -> TicketResult<CreatedTicket>;

    /// Whether the filer has everything it needs to reach the tracker.
    fn is_configured(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TicketError::Rejected {
            status: 400,
            body: "{\"errors\":{}}".into(),
        };
        assert_eq!(err.to_string(), "Jira error: 400 - {\"errors\":{}}");

        let err = TicketError::NotConfigured(vec!["JIRA_URL", "JIRA_API_TOKEN"]);
        assert_eq!(
            err.to_string(),
            "ticketing is not configured (missing JIRA_URL, JIRA_API_TOKEN)"
        );
    }

    #[test]
    fn test_request_kind() {
        let request = TicketRequest::EndpointDown {
            name: "orders".into(),
            url: "http://orders".into(),
            error_message: "Timeout".into(),
        };
        assert_eq!(request.kind(), "endpoint_down");
    }
}
