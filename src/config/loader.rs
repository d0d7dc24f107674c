//! Configuration loading from the process environment.

use std::collections::HashMap;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{BridgeConfig, LogFormat, MonitoredEndpoint};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from the process environment.
///
/// A `.env` file in the working directory is read first when present; variables
/// already set in the environment take precedence.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    let _ = dotenv::dotenv();
    let config = parse_env(|key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse configuration from a map of variables without validating it.
pub fn parse_vars(vars: &HashMap<String, String>) -> Result<BridgeConfig, ConfigError> {
    parse_env(|key| vars.get(key).cloned())
}

/// Parse configuration through a variable lookup function.
pub fn parse_env<F>(lookup: F) -> Result<BridgeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let mut config = BridgeConfig::default();

    // Server
    let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port: u16 = parse_or(&get, "PORT", 5000)?;
    config.server.bind_address = format!("{}:{}", host.trim(), port);
    config.server.request_timeout_secs =
        parse_or(&get, "REQUEST_TIMEOUT", config.server.request_timeout_secs)?;
    config.server.max_body_bytes = parse_or(&get, "MAX_BODY_BYTES", config.server.max_body_bytes)?;

    // Jira
    config.jira.url = get("JIRA_URL").map(|v| v.trim().to_string());
    config.jira.username = get("JIRA_USERNAME");
    config.jira.api_token = get("JIRA_API_TOKEN");
    config.jira.project_key = get("JIRA_PROJECT_KEY").map(|v| v.trim().to_string());
    if let Some(issue_type) = get("JIRA_ISSUE_TYPE") {
        config.jira.issue_type = issue_type.trim().to_string();
    }
    config.jira.timeout_secs = parse_or(&get, "JIRA_TIMEOUT", config.jira.timeout_secs)?;

    // Monitoring
    if let Some(raw) = get("MONITORED_APIS") {
        config.monitoring.endpoints = parse_endpoints(&raw);
    }
    config.monitoring.interval_secs =
        parse_or(&get, "HEALTH_CHECK_INTERVAL", config.monitoring.interval_secs)?;
    config.monitoring.timeout_secs =
        parse_or(&get, "HEALTH_CHECK_TIMEOUT", config.monitoring.timeout_secs)?;
    config.monitoring.retry_threshold =
        parse_or(&get, "HEALTH_CHECK_RETRY", config.monitoring.retry_threshold)?;
    config.monitoring.autostart =
        parse_bool_or(&get, "MONITORING_AUTOSTART", config.monitoring.autostart)?;
    config.monitoring.dedup_policy =
        parse_or(&get, "TICKET_DEDUP_POLICY", config.monitoring.dedup_policy)?;

    // Endpoint-down tickets
    if let Some(priority) = get("TICKET_PRIORITY_API_DOWN") {
        config.tickets.priority = priority.trim().to_string();
    }
    if let Some(labels) = get("TICKET_LABELS_API_DOWN") {
        config.tickets.labels = split_list(&labels);
    }
    config.tickets.assignee = get("TICKET_ASSIGNEE_API_DOWN").map(|v| v.trim().to_string());
    if let Some(components) = get("TICKET_COMPONENTS_API_DOWN") {
        config.tickets.components = split_list(&components);
    }
    if let Some(prefix) = get("TICKET_SUMMARY_PREFIX_API_DOWN") {
        config.tickets.summary_prefix = prefix.trim().to_string();
    }
    if let Some(text) = get("TICKET_DESCRIPTION_API_DOWN") {
        config.tickets.description_text = text;
    }

    // Webhook
    config.webhook.enabled = parse_bool_or(&get, "WEBHOOK_ENABLED", config.webhook.enabled)?;

    // Observability
    if let Some(filter) = get("LOG_FILTER") {
        config.observability.log_filter = filter.trim().to_string();
    }
    if let Some(format) = get("LOG_FORMAT") {
        config.observability.log_format = match format.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: format,
                    reason: "expected 'pretty' or 'json'".to_string(),
                })
            }
        };
    }
    config.observability.metrics_enabled = parse_bool_or(
        &get,
        "METRICS_ENABLED",
        config.observability.metrics_enabled,
    )?;
    if let Some(addr) = get("METRICS_ADDRESS") {
        config.observability.metrics_address = addr.trim().to_string();
    }

    Ok(config)
}

/// Parse the `MONITORED_APIS` list: `url|name,url|name` or bare URLs.
///
/// A bare URL is named after its host (and port, when present).
pub fn parse_endpoints(raw: &str) -> Vec<MonitoredEndpoint> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('|') {
            Some((url, name)) => MonitoredEndpoint::new(url.trim(), name.trim()),
            None => MonitoredEndpoint::new(entry, host_name(entry)),
        })
        .collect()
}

fn host_name(raw_url: &str) -> String {
    match url::Url::parse(raw_url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => raw_url.to_string(),
        },
        Err(_) => raw_url.to_string(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool_or<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                reason: "expected a boolean".to_string(),
            }),
        },
    }
}
