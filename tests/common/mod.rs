//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;

use health_ticket_bridge::config::{BridgeConfig, MonitoredEndpoint, MonitoringConfig};
use health_ticket_bridge::health::{HealthProbe, Monitor, ProbeOutcome};
use health_ticket_bridge::ticketing::{
    CreatedTicket, TicketError, TicketFiler, TicketRequest, TicketResult,
};
use health_ticket_bridge::{HttpServer, Shutdown};

/// A prober that replays scripted outcomes per URL, healthy once a script runs out.
#[derive(Default)]
pub struct ScriptedProber {
    scripts: Mutex<HashMap<String, VecDeque<ProbeOutcome>>>,
    calls: AtomicUsize,
    panic_on_first_call: bool,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panicking_once() -> Self {
        Self {
            panic_on_first_call: true,
            ..Self::default()
        }
    }

    pub fn script(&self, url: &str, outcomes: impl IntoIterator<Item = ProbeOutcome>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(outcomes);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProber {
    async fn probe(&self, endpoint_url: &str) -> ProbeOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_first_call && call == 0 {
            panic!("scripted probe failure");
        }

        self.scripts
            .lock()
            .unwrap()
            .get_mut(endpoint_url)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| ProbeOutcome::healthy("API UP"))
    }
}

pub fn down(message: &str) -> ProbeOutcome {
    ProbeOutcome::unhealthy(message)
}

pub fn up() -> ProbeOutcome {
    ProbeOutcome::healthy("API UP")
}

/// A ticket filer that records every request.
pub struct RecordingFiler {
    requests: Mutex<Vec<TicketRequest>>,
    failures_left: AtomicUsize,
    configured: bool,
}

impl RecordingFiler {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(0),
            configured: true,
        }
    }

    /// Fail the first `n` filings with a rejected response.
    pub fn failing_first(n: usize) -> Self {
        let filer = Self::new();
        filer.failures_left.store(n, Ordering::SeqCst);
        filer
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn requests(&self) -> Vec<TicketRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TicketFiler for RecordingFiler {
    async fn file_ticket(&self, request: &TicketRequest) -> TicketResult<CreatedTicket> {
        let attempt = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TicketError::Rejected {
                status: 503,
                body: "tracker unavailable".to_string(),
            });
        }

        let key = format!("OPS-{}", attempt);
        Ok(CreatedTicket {
            url: format!("https://jira.test/browse/{}", key),
            key,
        })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

pub fn monitoring(endpoints: &[(&str, &str)]) -> MonitoringConfig {
    MonitoringConfig {
        endpoints: endpoints
            .iter()
            .map(|(url, name)| MonitoredEndpoint::new(*url, *name))
            .collect(),
        interval_secs: 1,
        timeout_secs: 1,
        ..MonitoringConfig::default()
    }
}

pub fn monitor(
    settings: MonitoringConfig,
    prober: Arc<ScriptedProber>,
    filer: Arc<RecordingFiler>,
    shutdown: &Shutdown,
) -> Arc<Monitor> {
    Arc::new(Monitor::new(settings, prober, filer, shutdown.clone()))
}

/// Configuration with complete Jira settings pointing at `jira_url`.
pub fn configured(jira_url: &str) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.jira.url = Some(jira_url.to_string());
    config.jira.username = Some("user".to_string());
    config.jira.api_token = Some("token".to_string());
    config.jira.project_key = Some("OPS".to_string());
    config
}

/// Serve `server` on an ephemeral port and return its address.
pub async fn spawn_server(server: HttpServer, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    addr
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
