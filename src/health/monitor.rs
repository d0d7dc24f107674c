//! Periodic health monitoring.
//!
//! # Responsibilities
//! - Probe every configured endpoint once per cycle
//! - Drive the per-endpoint state machine in the store
//! - File a ticket under the dedup rule when an endpoint goes down
//! - Survive any failure inside a cycle and keep polling

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::FutureExt;
use serde::Serialize;
use tokio::time;

use crate::config::{MonitoredEndpoint, MonitoringConfig};
use crate::health::probe::HealthProbe;
use crate::health::state::EndpointStore;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::ticketing::{TicketFiler, TicketRequest};

/// Result of [`Monitor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    NoEndpoints,
}

/// Counters for one polling cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub probed: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub tickets_filed: usize,
    pub ticket_failures: usize,
}

/// Owns the endpoint list, the status store and the polling loop.
pub struct Monitor {
    endpoints: Vec<MonitoredEndpoint>,
    settings: MonitoringConfig,
    store: EndpointStore,
    prober: Arc<dyn HealthProbe>,
    filer: Arc<dyn TicketFiler>,
    running: AtomicBool,
    shutdown: Shutdown,
}

/// Releases the running flag when the loop task ends, however it ends.
struct RunningGuard(Arc<Monitor>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
        tracing::info!("Health monitor stopped");
    }
}

impl Monitor {
    pub fn new(
        settings: MonitoringConfig,
        prober: Arc<dyn HealthProbe>,
        filer: Arc<dyn TicketFiler>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            endpoints: settings.endpoints.clone(),
            settings,
            store: EndpointStore::new(),
            prober,
            filer,
            running: AtomicBool::new(false),
            shutdown,
        }
    }

    pub fn endpoints(&self) -> &[MonitoredEndpoint] {
        &self.endpoints
    }

    /// Number of endpoints with a non-empty URL.
    pub fn active_endpoint_count(&self) -> usize {
        self.endpoints.iter().filter(|e| e.has_url()).count()
    }

    pub fn settings(&self) -> &MonitoringConfig {
        &self.settings
    }

    pub fn store(&self) -> &EndpointStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the polling loop unless one is already active.
    pub fn start(self: &Arc<Self>) -> StartOutcome {
        if self.active_endpoint_count() == 0 {
            tracing::warn!("No endpoints configured for monitoring");
            return StartOutcome::NoEndpoints;
        }

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Health monitor already running");
            return StartOutcome::AlreadyRunning;
        }

        let names: Vec<&str> = self.endpoints.iter().map(|e| e.name.as_str()).collect();
        tracing::info!(
            count = self.endpoints.len(),
            endpoints = %names.join(", "),
            interval_secs = self.settings.interval_secs,
            "Health monitor starting"
        );

        let guard = RunningGuard(Arc::clone(self));
        tokio::spawn(async move {
            let monitor = Arc::clone(&guard.0);
            monitor.run().await;
            drop(guard);
        });

        StartOutcome::Started
    }

    async fn run(&self) {
        let mut shutdown = self.shutdown.subscribe();
        let interval = Duration::from_secs(self.settings.interval_secs);

        loop {
            // A trigger sent before `subscribe` is not replayed by the channel.
            if self.shutdown.is_triggered() {
                break;
            }

            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(report) => {
                    tracing::debug!(
                        probed = report.probed,
                        unhealthy = report.unhealthy,
                        tickets_filed = report.tickets_filed,
                        "Monitoring cycle complete"
                    );
                }
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(error = %reason, "Monitoring cycle aborted");
                }
            }

            tokio::select! {
                _ = time::sleep(interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every endpoint once and apply the results.
    pub async fn run_cycle(&self) -> CycleReport {
        let start = Instant::now();
        let mut report = CycleReport::default();

        for endpoint in self.endpoints.iter().filter(|e| e.has_url()) {
            self.check_endpoint(endpoint, &mut report).await;
        }

        metrics::record_cycle(start);
        report
    }

    async fn check_endpoint(&self, endpoint: &MonitoredEndpoint, report: &mut CycleReport) {
        let url = endpoint.url.trim();
        let key = endpoint.key();

        let outcome = self.prober.probe(url).await;
        let now = Utc::now();
        report.probed += 1;

        if outcome.healthy {
            report.healthy += 1;
            let recovered = self.store.update(&key, &endpoint.name, now, |status| {
                status.record_success(now, &outcome.message, self.settings.dedup_policy)
            });
            if recovered {
                tracing::info!(endpoint = %endpoint.name, url = %url, "Endpoint is back UP");
            }
        } else {
            report.unhealthy += 1;
            let file_ticket = self.store.update(&key, &endpoint.name, now, |status| {
                status.record_failure(now, &outcome.message, self.settings.retry_threshold)
            });

            if file_ticket {
                tracing::warn!(
                    endpoint = %endpoint.name,
                    url = %url,
                    error = %outcome.message,
                    "Endpoint is DOWN"
                );

                let request = TicketRequest::EndpointDown {
                    name: endpoint.name.clone(),
                    url: url.to_string(),
                    error_message: outcome.message.clone(),
                };

                match self.filer.file_ticket(&request).await {
                    Ok(ticket) => {
                        self.store.mark_ticket_filed(&key, now, &ticket.key);
                        report.tickets_filed += 1;
                        tracing::info!(
                            endpoint = %endpoint.name,
                            ticket_key = %ticket.key,
                            "Ticket filed for down endpoint"
                        );
                    }
                    Err(e) => {
                        report.ticket_failures += 1;
                        tracing::error!(
                            endpoint = %endpoint.name,
                            error = %e,
                            "Could not file ticket for down endpoint"
                        );
                    }
                }
            }
        }

        metrics::record_endpoint_state(&key, outcome.healthy);
        tracing::debug!(
            endpoint = %endpoint.name,
            url = %url,
            message = %outcome.message,
            "Health check"
        );
    }
}
