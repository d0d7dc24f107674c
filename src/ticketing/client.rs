//! Jira REST v2 client.
//!
//! # Responsibilities
//! - Authenticate with HTTP Basic auth (username + API token)
//! - Create issues and build browsable ticket URLs
//! - Connectivity checks used by the operator CLI
//! - Bound every request with a timeout

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{JiraConfig, TicketTemplateConfig};
use crate::observability::metrics;
use crate::ticketing::issue::{build_issue, IssuePayload};
use crate::ticketing::types::{CreatedTicket, TicketError, TicketFiler, TicketRequest, TicketResult};

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
struct Transitions {
    #[serde(default)]
    transitions: Vec<Transition>,
}

#[derive(Debug, Deserialize)]
struct Transition {
    id: String,
    name: String,
}

/// Files tickets in Jira.
#[derive(Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    config: JiraConfig,
    templates: TicketTemplateConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig, templates: TicketTemplateConfig) -> TicketResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            templates,
        })
    }

    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    /// Browsable URL of an issue.
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.config.base_url().unwrap_or_default(), key)
    }

    fn request(&self, method: Method, path: &str) -> TicketResult<RequestBuilder> {
        let missing = self.config.missing_fields();
        if !missing.is_empty() {
            return Err(TicketError::NotConfigured(missing));
        }

        let base = self.config.base_url().unwrap_or_default();
        let username = self.config.username.as_deref().unwrap_or_default();
        let token = self.config.api_token.as_deref();

        Ok(self
            .client
            .request(method, format!("{}{}", base, path))
            .basic_auth(username, token))
    }

    async fn read_json(response: reqwest::Response, expected: StatusCode) -> TicketResult<Value> {
        let status = response.status();
        let body = response.text().await?;

        if status != expected {
            return Err(TicketError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TicketError::InvalidResponse(e.to_string()))
    }

    /// Submit a prepared issue body.
    pub async fn create_issue(&self, payload: &IssuePayload) -> TicketResult<CreatedTicket> {
        let response = self
            .request(Method::POST, "/rest/api/2/issue")?
            .json(payload)
            .send()
            .await?;

        let body = Self::read_json(response, StatusCode::CREATED).await?;
        let created: CreatedIssue =
            serde_json::from_value(body).map_err(|e| TicketError::InvalidResponse(e.to_string()))?;

        Ok(CreatedTicket {
            url: self.browse_url(&created.key),
            key: created.key,
        })
    }

    /// The authenticated user (`GET /rest/api/2/myself`).
    pub async fn current_user(&self) -> TicketResult<Value> {
        let response = self.request(Method::GET, "/rest/api/2/myself")?.send().await?;
        Self::read_json(response, StatusCode::OK).await
    }

    /// Project details (`GET /rest/api/2/project/{key}`).
    pub async fn project(&self, key: &str) -> TicketResult<Value> {
        let response = self
            .request(Method::GET, &format!("/rest/api/2/project/{}", key))?
            .send()
            .await?;
        Self::read_json(response, StatusCode::OK).await
    }

    /// Move an issue through the workflow transition with the given name.
    pub async fn transition_issue(&self, key: &str, transition_name: &str) -> TicketResult<()> {
        let path = format!("/rest/api/2/issue/{}/transitions", key);

        let response = self.request(Method::GET, &path)?.send().await?;
        let body = Self::read_json(response, StatusCode::OK).await?;
        let available: Transitions =
            serde_json::from_value(body).map_err(|e| TicketError::InvalidResponse(e.to_string()))?;

        let transition = available
            .transitions
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(transition_name))
            .ok_or_else(|| TicketError::TransitionNotFound(transition_name.to_string()))?;

        let response = self
            .request(Method::POST, &path)?
            .json(&json!({ "transition": { "id": transition.id } }))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(TicketError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TicketFiler for JiraClient {
    async fn file_ticket(&self, request: &TicketRequest) -> TicketResult<CreatedTicket> {
        let payload = build_issue(&self.config, &self.templates, request, Utc::now());

        let result = self.create_issue(&payload).await;
        match &result {
            Ok(ticket) => {
                tracing::info!(
                    kind = request.kind(),
                    ticket_key = %ticket.key,
                    ticket_url = %ticket.url,
                    "Jira ticket created"
                );
            }
            Err(e) => {
                tracing::error!(kind = request.kind(), error = %e, "Failed to create Jira ticket");
            }
        }
        metrics::record_ticket(request.kind(), result.is_ok());
        result
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JiraConfig {
        JiraConfig {
            url: Some("https://jira.example.com/".into()),
            username: Some("bot".into()),
            api_token: Some("secret".into()),
            project_key: Some("OPS".into()),
            ..JiraConfig::default()
        }
    }

    #[test]
    fn test_browse_url_strips_trailing_slash() {
        let client = JiraClient::new(config(), TicketTemplateConfig::default()).unwrap();
        assert_eq!(
            client.browse_url("OPS-12"),
            "https://jira.example.com/browse/OPS-12"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_client_refuses_to_file() {
        let client = JiraClient::new(JiraConfig::default(), TicketTemplateConfig::default()).unwrap();
        assert!(!client.is_configured());

        let request = TicketRequest::EndpointDown {
            name: "orders".into(),
            url: "http://orders".into(),
            error_message: "Timeout".into(),
        };
        match client.file_ticket(&request).await {
            Err(TicketError::NotConfigured(missing)) => assert_eq!(missing.len(), 4),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
