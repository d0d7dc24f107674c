//! Configuration validation.
//!
//! Semantic checks run after the environment has been parsed. All problems are
//! collected so the operator sees every missing setting at once.

use thiserror::Error;

use crate::config::schema::BridgeConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid URL for {name}: '{url}' ({reason})")]
    InvalidUrl {
        name: String,
        url: String,
        reason: String,
    },
}

/// Validate a parsed configuration, returning every error found.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors: Vec<ValidationError> = config
        .jira
        .missing_fields()
        .into_iter()
        .map(ValidationError::Missing)
        .collect();

    if let Some(base) = config.jira.base_url() {
        if !base.is_empty() {
            if let Err(e) = url::Url::parse(base) {
                errors.push(ValidationError::InvalidUrl {
                    name: "JIRA_URL".to_string(),
                    url: base.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let monitoring = &config.monitoring;
    if monitoring.interval_secs == 0 {
        errors.push(ValidationError::Zero("HEALTH_CHECK_INTERVAL"));
    }
    if monitoring.timeout_secs == 0 {
        errors.push(ValidationError::Zero("HEALTH_CHECK_TIMEOUT"));
    }
    if monitoring.retry_threshold == 0 {
        errors.push(ValidationError::Zero("HEALTH_CHECK_RETRY"));
    }
    if config.jira.timeout_secs == 0 {
        errors.push(ValidationError::Zero("JIRA_TIMEOUT"));
    }

    for endpoint in monitoring.endpoints.iter().filter(|e| e.has_url()) {
        if let Err(e) = url::Url::parse(endpoint.url.trim()) {
            errors.push(ValidationError::InvalidUrl {
                name: endpoint.name.clone(),
                url: endpoint.url.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
