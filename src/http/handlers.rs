//! Request handlers for the bridge's HTTP surface.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::alerts::AlertTicket;
use crate::config::{MonitoredEndpoint, TicketDedupPolicy};
use crate::health::{EndpointStatus, StartOutcome};
use crate::http::error::ApiError;
use crate::http::server::AppState;

pub const SERVICE_NAME: &str = "Jira Webhook for Prometheus";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub jira_configured: bool,
    pub monitoring_active: bool,
    pub monitored_apis: usize,
    pub api_status: BTreeMap<String, EndpointStatus>,
}

#[derive(Serialize)]
pub struct EffectiveConfig {
    pub health_check_interval: u64,
    pub timeout: u64,
    pub retry_attempts: u32,
    pub ticket_dedup_policy: TicketDedupPolicy,
    pub ticket_priority: String,
    pub ticket_labels: Vec<String>,
    pub ticket_assignee: Option<String>,
    pub ticket_components: Vec<String>,
    pub webhook_enabled: bool,
}

#[derive(Serialize)]
pub struct MonitoringStatusResponse {
    pub monitoring_active: bool,
    pub monitored_apis: Vec<MonitoredEndpoint>,
    pub api_status: BTreeMap<String, EndpointStatus>,
    pub config: EffectiveConfig,
}

#[derive(Serialize)]
pub struct StartResponse {
    pub message: &'static str,
    pub started: bool,
    pub outcome: StartOutcome,
    pub monitoring_active: bool,
    pub monitored_apis: Vec<MonitoredEndpoint>,
}

/// `GET /`: service metadata and endpoint index.
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    let mut endpoints = json!({
        "health": "/health",
        "monitoring_status": "/monitoring/status",
        "monitoring_start": "/monitoring/start",
    });
    if state.config.webhook.enabled {
        endpoints["webhook"] = json!("/webhook/prometheus");
    }

    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "monitoring_active": state.monitor.is_running(),
        "endpoints": endpoints,
    }))
}

/// `GET /health`: liveness plus the full endpoint status snapshot.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        jira_configured: state.filer.is_configured(),
        monitoring_active: state.monitor.is_running(),
        monitored_apis: state.monitor.active_endpoint_count(),
        api_status: state.monitor.store().snapshot(),
    })
}

/// `GET /monitoring/status`: snapshot plus the effective configuration.
pub async fn monitoring_status(State(state): State<AppState>) -> Json<MonitoringStatusResponse> {
    let settings = state.monitor.settings();
    let tickets = &state.config.tickets;

    Json(MonitoringStatusResponse {
        monitoring_active: state.monitor.is_running(),
        monitored_apis: state.monitor.endpoints().to_vec(),
        api_status: state.monitor.store().snapshot(),
        config: EffectiveConfig {
            health_check_interval: settings.interval_secs,
            timeout: settings.timeout_secs,
            retry_attempts: settings.retry_threshold,
            ticket_dedup_policy: settings.dedup_policy,
            ticket_priority: tickets.priority.clone(),
            ticket_labels: tickets.labels.clone(),
            ticket_assignee: tickets.assignee.clone(),
            ticket_components: tickets.components.clone(),
            webhook_enabled: state.config.webhook.enabled,
        },
    })
}

/// `POST /monitoring/start`: start the loop if it is not already running.
pub async fn start_monitoring(State(state): State<AppState>) -> Json<StartResponse> {
    let outcome = state.monitor.start();
    let message = match outcome {
        StartOutcome::Started => "Monitoring started",
        StartOutcome::AlreadyRunning => "Monitoring already running",
        StartOutcome::NoEndpoints => "No endpoints configured for monitoring",
    };

    Json(StartResponse {
        message,
        started: outcome == StartOutcome::Started,
        outcome,
        monitoring_active: state.monitor.is_running(),
        monitored_apis: state.monitor.endpoints().to_vec(),
    })
}

/// `POST /webhook/prometheus`: file a ticket for a pushed alert.
pub async fn prometheus_webhook(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        let error = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
        } else {
            ApiError::bad_request("No valid JSON data received")
        };
        error.with_details(rejection.body_text())
    })?;

    tracing::info!(payload = %payload, "Received Prometheus alert");

    let alert = AlertTicket::from_payload(&payload).map_err(|e| ApiError::bad_request(e.to_string()))?;

    if !state.filer.is_configured() {
        tracing::error!("Jira configuration incomplete, cannot file alert ticket");
        return Err(ApiError::internal("Jira configuration incomplete"));
    }

    let ticket = state
        .filer
        .file_ticket(&alert.into_request())
        .await
        .map_err(|e| ApiError::internal("Failed to create ticket").with_details(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Jira ticket created",
            "ticket_key": ticket.key,
            "ticket_url": ticket.url,
        })),
    ))
}

pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
