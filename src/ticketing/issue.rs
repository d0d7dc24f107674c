//! Issue payload construction.
//!
//! Turns a [`TicketRequest`] into the `{"fields": {...}}` body expected by
//! `POST /rest/api/2/issue`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::alerts::AlertTicket;
use crate::config::{JiraConfig, TicketTemplateConfig};
use crate::health::probe::normalize_health_url;
use crate::ticketing::types::TicketRequest;

#[derive(Debug, Clone, Serialize)]
pub struct IssuePayload {
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueFields {
    pub project: KeyRef,
    pub issuetype: NameRef,
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<NameRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<NameRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<NameRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRef {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameRef {
    pub name: String,
}

impl NameRef {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Build the issue body for a request.
pub fn build_issue(
    jira: &JiraConfig,
    templates: &TicketTemplateConfig,
    request: &TicketRequest,
    now: DateTime<Utc>,
) -> IssuePayload {
    let project = KeyRef {
        key: jira.project_key.clone().unwrap_or_default(),
    };
    let issuetype = NameRef::new(jira.issue_type.clone());

    let fields = match request {
        TicketRequest::EndpointDown {
            name,
            url,
            error_message,
        } => IssueFields {
            project,
            issuetype,
            summary: format!("{} - {}", templates.summary_prefix, name),
            description: endpoint_down_description(templates, name, url, error_message, now),
            priority: Some(NameRef::new(templates.priority.clone())),
            labels: templates.labels.clone(),
            assignee: templates
                .assignee
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(NameRef::new),
            components: templates
                .components
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(NameRef::new)
                .collect(),
        },
        TicketRequest::Alert(alert) => IssueFields {
            project,
            issuetype,
            summary: alert.ticket_summary(),
            description: alert_description(alert, now),
            priority: Some(NameRef::new(alert.priority())),
            labels: alert.labels(),
            assignee: None,
            components: Vec::new(),
        },
    };

    IssuePayload { fields }
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn endpoint_down_description(
    templates: &TicketTemplateConfig,
    name: &str,
    url: &str,
    error_message: &str,
    now: DateTime<Utc>,
) -> String {
    let mut description = format!(
        "*API Monitoring Alert*\n\n\
         - *API Name*: {name}\n\
         - *API URL*: {url}\n\
         - *Status*: DOWN\n\
         - *Error*: {error_message}\n\
         - *Timestamp*: {ts}\n\
         - *Health Check Endpoint*: {health}\n",
        ts = timestamp(now),
        health = normalize_health_url(url),
    );

    let extra = templates.description_text.trim();
    if !extra.is_empty() {
        description.push('\n');
        description.push_str(extra);
        description.push('\n');
    }
    description
}

fn alert_description(alert: &AlertTicket, now: DateTime<Utc>) -> String {
    let payload = serde_json::to_string_pretty(&alert.payload).unwrap_or_else(|_| "{}".to_string());
    format!(
        "*Prometheus Alert*\n\
         - *Alert name*: {}\n\
         - *Status*: {}\n\
         - *Severity*: {}\n\
         - *Description*: {}\n\
         - *Timestamp*: {}\n\n\
         *Full alert payload:*\n\
         {{code:json}}\n{}\n{{code}}\n",
        alert.name,
        alert.status,
        alert.severity,
        alert.description,
        timestamp(now),
        payload,
    )
}
