//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! Every section has defaults so that only the Jira credentials are mandatory.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Root configuration for the bridge.
#[derive(Debug, Clone, Serialize, Default)]
pub struct BridgeConfig {
    /// Inbound HTTP server settings.
    pub server: ServerConfig,

    /// Issue tracker connection settings.
    pub jira: JiraConfig,

    /// Health polling settings and the monitored endpoints.
    pub monitoring: MonitoringConfig,

    /// Content of the tickets filed for down endpoints.
    pub tickets: TicketTemplateConfig,

    /// Inbound alert webhook settings.
    pub webhook: WebhookConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Inbound HTTP server configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Inbound request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Issue tracker (Jira REST v2) configuration.
#[derive(Debug, Clone, Serialize)]
pub struct JiraConfig {
    /// Base URL, e.g. "https://jira.example.com".
    pub url: Option<String>,

    /// Basic auth user name.
    pub username: Option<String>,

    /// Basic auth token or password.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,

    /// Project the tickets are filed in.
    pub project_key: Option<String>,

    /// Issue type name (default: "Task").
    pub issue_type: String,

    /// Timeout for ticketing requests in seconds.
    pub timeout_secs: u64,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            api_token: None,
            project_key: None,
            issue_type: "Task".to_string(),
            timeout_secs: 10,
        }
    }
}

impl JiraConfig {
    /// Names of the required settings that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("JIRA_URL", &self.url),
            ("JIRA_USERNAME", &self.username),
            ("JIRA_API_TOKEN", &self.api_token),
            ("JIRA_PROJECT_KEY", &self.project_key),
        ];

        required
            .into_iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| name)
            .collect()
    }

    /// True when every required setting is present.
    pub fn is_configured(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> Option<&str> {
        self.url.as_deref().map(|u| u.trim().trim_end_matches('/'))
    }
}

/// Identity of an endpoint URL: trimmed, without trailing slashes.
///
/// Used for store keys and for the `endpoint` metric label.
pub fn endpoint_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// A monitored service: base URL plus a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoredEndpoint {
    pub url: String,
    pub name: String,
}

impl MonitoredEndpoint {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }

    /// Key under which the endpoint's status is tracked.
    pub fn key(&self) -> String {
        endpoint_key(&self.url)
    }

    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Whether a recovered endpoint may receive a new ticket on its next outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketDedupPolicy {
    /// At most one ticket per endpoint for the lifetime of the process.
    #[default]
    OncePerProcess,
    /// The dedup guard is cleared when the endpoint comes back up.
    ResetOnRecovery,
}

impl fmt::Display for TicketDedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketDedupPolicy::OncePerProcess => write!(f, "once-per-process"),
            TicketDedupPolicy::ResetOnRecovery => write!(f, "reset-on-recovery"),
        }
    }
}

impl FromStr for TicketDedupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once-per-process" | "once" => Ok(TicketDedupPolicy::OncePerProcess),
            "reset-on-recovery" | "reset" => Ok(TicketDedupPolicy::ResetOnRecovery),
            other => Err(format!(
                "unknown ticket dedup policy '{}' (expected once-per-process or reset-on-recovery)",
                other
            )),
        }
    }
}

/// Health polling configuration.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringConfig {
    /// Endpoints probed on every cycle.
    pub endpoints: Vec<MonitoredEndpoint>,

    /// Pause between cycles in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Consecutive failures after which an already-down endpoint qualifies for a ticket.
    pub retry_threshold: u32,

    /// Start the polling loop when the process boots.
    pub autostart: bool,

    /// Ticket dedup behaviour across down-episodes.
    pub dedup_policy: TicketDedupPolicy,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            interval_secs: 30,
            timeout_secs: 10,
            retry_threshold: 3,
            autostart: true,
            dedup_policy: TicketDedupPolicy::default(),
        }
    }
}

/// Settings for endpoint-down tickets.
#[derive(Debug, Clone, Serialize)]
pub struct TicketTemplateConfig {
    pub priority: String,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    pub components: Vec<String>,
    pub summary_prefix: String,
    pub description_text: String,
}

pub const DEFAULT_DOWN_DESCRIPTION: &str = "\
*Technical details:*
- The service no longer answers its health checks
- Check the availability of the service
- Review the application logs

*Recommended actions:*
1. Check the application logs
2. Restart the service if needed
3. Check system resources (CPU, memory, disk)
4. Check network connectivity";

impl Default for TicketTemplateConfig {
    fn default() -> Self {
        Self {
            priority: "High".to_string(),
            labels: ["api-monitoring", "spring-boot", "critical", "downtime"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            assignee: None,
            components: Vec::new(),
            summary_prefix: "[CRITICAL] API DOWN".to_string(),
            description_text: DEFAULT_DOWN_DESCRIPTION.to_string(),
        }
    }
}

/// Inbound alert webhook configuration.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookConfig {
    /// Mount `POST /webhook/prometheus`.
    pub enabled: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_filter: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus metrics listener.
    pub metrics_enabled: bool,

    /// Metrics listener bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "health_ticket_bridge=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
