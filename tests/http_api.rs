//! End-to-end tests of the HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use health_ticket_bridge::config::{BridgeConfig, TicketTemplateConfig};
use health_ticket_bridge::health::Monitor;
use health_ticket_bridge::ticketing::{
    CreatedTicket, JiraClient, TicketFiler, TicketRequest, TicketResult,
};
use health_ticket_bridge::{HttpServer, Shutdown};

mod common;

use common::{monitoring, RecordingFiler, ScriptedProber};

const ORDERS: &str = "http://orders:8080";

async fn serve(config: BridgeConfig, filer: Arc<dyn TicketFiler>, shutdown: &Shutdown) -> SocketAddr {
    let monitor = Arc::new(Monitor::new(
        config.monitoring.clone(),
        Arc::new(ScriptedProber::new()),
        filer.clone(),
        shutdown.clone(),
    ));
    common::spawn_server(HttpServer::with_components(config, monitor, filer), shutdown).await
}

fn with_endpoints(mut config: BridgeConfig) -> BridgeConfig {
    config.monitoring = monitoring(&[(ORDERS, "Orders")]);
    config
}

fn alert_payload() -> Value {
    json!({
        "status": "firing",
        "alerts": [{
            "labels": {"alertname": "HighErrorRate", "severity": "critical"},
            "annotations": {
                "summary": "Error rate above 5%",
                "description": "checkout is failing"
            }
        }]
    })
}

#[tokio::test]
async fn test_index_describes_service() {
    let shutdown = Shutdown::new();
    let addr = serve(BridgeConfig::default(), Arc::new(RecordingFiler::new()), &shutdown).await;

    let body: Value = reqwest::get(format!("http://{}/", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["webhook"], "/webhook/prometheus");

    shutdown.trigger();
}

#[tokio::test]
async fn test_health_reports_unconfigured_jira() {
    let shutdown = Shutdown::new();
    let config = with_endpoints(BridgeConfig::default());
    let filer = JiraClient::new(config.jira.clone(), TicketTemplateConfig::default()).unwrap();
    let addr = serve(config, Arc::new(filer), &shutdown).await;

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["jira_configured"], false);
    assert_eq!(body["monitoring_active"], false);
    assert_eq!(body["monitored_apis"], 1);
    assert_eq!(body["api_status"], json!({}));

    shutdown.trigger();
}

#[tokio::test]
async fn test_start_monitoring_twice() {
    let shutdown = Shutdown::new();
    let config = with_endpoints(BridgeConfig::default());
    let addr = serve(config, Arc::new(RecordingFiler::new()), &shutdown).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/monitoring/start", addr);

    let first: Value = client.post(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(first["started"], true);
    assert_eq!(first["monitoring_active"], true);
    assert_eq!(first["monitored_apis"][0]["url"], ORDERS);

    let second: Value = client.post(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(second["started"], false);
    assert_eq!(second["message"], "Monitoring already running");

    let status: Value = reqwest::get(format!("http://{}/monitoring/status", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["monitoring_active"], true);
    assert_eq!(status["config"]["health_check_interval"], 1);
    assert_eq!(status["config"]["retry_attempts"], 3);
    assert_eq!(status["config"]["ticket_priority"], "High");

    shutdown.trigger();
}

#[tokio::test]
async fn test_webhook_creates_ticket() {
    let jira = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue"))
        .and(body_partial_json(json!({
            "fields": {
                "summary": "[CRITICAL] Error rate above 5%",
                "priority": {"name": "High"}
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"key": "OPS-9"})))
        .expect(1)
        .mount(&jira)
        .await;

    let shutdown = Shutdown::new();
    let config = common::configured(&jira.uri());
    let filer = JiraClient::new(config.jira.clone(), config.tickets.clone()).unwrap();
    let addr = serve(config, Arc::new(filer), &shutdown).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/webhook/prometheus", addr))
        .json(&alert_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Jira ticket created");
    assert_eq!(body["ticket_key"], "OPS-9");
    assert_eq!(body["ticket_url"], format!("{}/browse/OPS-9", jira.uri()));

    shutdown.trigger();
}

#[tokio::test]
async fn test_webhook_rejects_bad_payloads() {
    let shutdown = Shutdown::new();
    let filer = Arc::new(RecordingFiler::new());
    let addr = serve(BridgeConfig::default(), filer.clone(), &shutdown).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/webhook/prometheus", addr);

    let response = client.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let response = client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No valid JSON data received");

    assert_eq!(filer.count(), 0);
    shutdown.trigger();
}

#[tokio::test]
async fn test_webhook_without_jira_config() {
    let shutdown = Shutdown::new();
    let filer = Arc::new(RecordingFiler::unconfigured());
    let addr = serve(BridgeConfig::default(), filer.clone(), &shutdown).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/webhook/prometheus", addr))
        .json(&alert_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Jira configuration incomplete");
    assert_eq!(filer.count(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_webhook_reports_tracker_failure() {
    let shutdown = Shutdown::new();
    let filer = Arc::new(RecordingFiler::failing_first(1));
    let addr = serve(BridgeConfig::default(), filer, &shutdown).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/webhook/prometheus", addr))
        .json(&alert_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to create ticket");
    assert!(body["details"].as_str().unwrap().contains("503"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_disabled_webhook_is_not_routed() {
    let shutdown = Shutdown::new();
    let mut config = BridgeConfig::default();
    config.webhook.enabled = false;
    let addr = serve(config, Arc::new(RecordingFiler::new()), &shutdown).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/webhook/prometheus", addr))
        .json(&alert_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let shutdown = Shutdown::new();
    let addr = serve(BridgeConfig::default(), Arc::new(RecordingFiler::new()), &shutdown).await;

    let response = reqwest::get(format!("http://{}/monitoring/start", addr)).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Method not allowed");

    shutdown.trigger();
}

/// A filer that takes longer than any request timeout used here.
struct StalledFiler;

#[async_trait]
impl TicketFiler for StalledFiler {
    async fn file_ticket(&self, _request: &TicketRequest) -> TicketResult<CreatedTicket> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(CreatedTicket {
            key: "OPS-1".to_string(),
            url: "https://jira.test/browse/OPS-1".to_string(),
        })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn test_oversized_webhook_body_is_json_error() {
    let shutdown = Shutdown::new();
    let mut config = BridgeConfig::default();
    config.server.max_body_bytes = 64;
    let filer = Arc::new(RecordingFiler::new());
    let addr = serve(config, filer.clone(), &shutdown).await;

    let body = serde_json::to_vec(&alert_payload()).unwrap();
    assert!(body.len() > 64);

    let response = reqwest::Client::new()
        .post(format!("http://{}/webhook/prometheus", addr))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()["content-type"], "application/json");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Request body too large");
    assert_eq!(filer.count(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_timeout_is_json_error() {
    let shutdown = Shutdown::new();
    let mut config = BridgeConfig::default();
    config.server.request_timeout_secs = 1;
    let addr = serve(config, Arc::new(StalledFiler), &shutdown).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/webhook/prometheus", addr))
        .json(&alert_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["content-type"], "application/json");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Request timed out");

    shutdown.trigger();
}
