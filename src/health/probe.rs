//! Health probing.
//!
//! # Responsibilities
//! - Build the `/actuator/health` URL for an endpoint
//! - Issue one GET per probe with a bounded timeout
//! - Fold every failure into an unhealthy verdict with a diagnostic message

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::endpoint_key;
use crate::observability::metrics;

pub const HEALTH_PATH: &str = "/actuator/health";

const USER_AGENT: &str = concat!("health-ticket-bridge/", env!("CARGO_PKG_VERSION"));

/// Verdict of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub message: String,
}

impl ProbeOutcome {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}

/// Something that can judge the health of an endpoint URL.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe the endpoint. Never fails: errors become unhealthy outcomes.
    async fn probe(&self, endpoint_url: &str) -> ProbeOutcome;
}

/// Append the actuator health path unless the URL already ends with it.
pub fn normalize_health_url(endpoint_url: &str) -> String {
    let clean = endpoint_url.trim();
    if clean.ends_with(HEALTH_PATH) {
        clean.to_string()
    } else {
        format!("{}{}", clean.trim_end_matches('/'), HEALTH_PATH)
    }
}

/// Interpret a received health response.
pub fn interpret_response(status: StatusCode, body: &[u8]) -> ProbeOutcome {
    if status != StatusCode::OK {
        return ProbeOutcome::unhealthy(format!("HTTP {}", status.as_u16()));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(health) => match health.get("status") {
            Some(Value::String(s)) if s == "UP" => ProbeOutcome::healthy("API UP"),
            Some(Value::String(s)) => ProbeOutcome::unhealthy(format!("API DOWN - Status: {}", s)),
            Some(other) => ProbeOutcome::unhealthy(format!("API DOWN - Status: {}", other)),
            None => ProbeOutcome::unhealthy("API DOWN - Status: null"),
        },
        // A 200 without a structured health body still proves liveness.
        Err(_) => ProbeOutcome::healthy("API UP (non-JSON response)"),
    }
}

/// Classify a transport-level failure.
pub fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Timeout".to_string()
    } else if error.is_connect() {
        "Connection Error".to_string()
    } else {
        format!("Error: {}", error)
    }
}

/// Probes endpoints over HTTP.
#[derive(Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl HealthProbe for HttpProber {
    async fn probe(&self, endpoint_url: &str) -> ProbeOutcome {
        if endpoint_url.trim().is_empty() {
            return ProbeOutcome::unhealthy("Empty URL");
        }

        let health_url = normalize_health_url(endpoint_url);
        let start = Instant::now();

        let outcome = match self
            .client
            .get(&health_url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                match response.bytes().await {
                    Ok(body) => interpret_response(status, &body),
                    Err(e) if status != StatusCode::OK => {
                        tracing::debug!(url = %health_url, error = %e, "Discarding unreadable error body");
                        interpret_response(status, &[])
                    }
                    Err(e) => ProbeOutcome::unhealthy(describe_transport_error(&e)),
                }
            }
            Err(e) => {
                tracing::debug!(url = %health_url, error = %e, "Health probe transport failure");
                ProbeOutcome::unhealthy(describe_transport_error(&e))
            }
        };

        metrics::record_probe(&endpoint_key(endpoint_url), outcome.healthy, start);
        outcome
    }
}
