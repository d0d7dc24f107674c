//! Health-check to issue-tracker bridge.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────┐
//!                  │                      BRIDGE                      │
//!                  │                                                  │
//!  Alertmanager    │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!  ────────────────┼─▶│  http   │───▶│  alerts  │───▶│ ticketing  │───┼──▶ Jira
//!                  │  │ server  │    │ adapter  │    │   client   │   │
//!  Operators       │  └────┬────┘    └──────────┘    └─────▲──────┘   │
//!  ────────────────┼──────▶│ status / start                │          │
//!                  │       ▼                               │          │
//!                  │  ┌─────────┐    ┌──────────┐          │          │
//!                  │  │ monitor │───▶│  probe   │──────────┼──────────┼──▶ /actuator/health
//!                  │  │  loop   │    └──────────┘          │          │
//!                  │  │ + state │──────────────────────────┘          │
//!                  │  └─────────┘                                     │
//!                  └──────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use tokio::net::TcpListener;

use health_ticket_bridge::config::{self, ConfigError};
use health_ticket_bridge::health::StartOutcome;
use health_ticket_bridge::lifecycle::signals::spawn_signal_handler;
use health_ticket_bridge::observability::{logging, metrics};
use health_ticket_bridge::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            // Logging is configured from the same environment; fall back to defaults.
            logging::init_logging(&Default::default());
            match &e {
                ConfigError::Validation(errors) => {
                    for error in errors {
                        tracing::error!(%error, "Invalid configuration");
                    }
                }
                ConfigError::Invalid { .. } => tracing::error!(error = %e, "Invalid configuration"),
            }
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "health-ticket-bridge starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        endpoints = config.monitoring.endpoints.len(),
        interval_secs = config.monitoring.interval_secs,
        retry_threshold = config.monitoring.retry_threshold,
        dedup_policy = %config.monitoring.dedup_policy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Bridge terminated with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: config::BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let autostart = config.monitoring.autostart;

    let server = HttpServer::new(config, shutdown.clone())?;

    if autostart {
        if server.monitor().start() == StartOutcome::NoEndpoints {
            tracing::warn!("Monitoring not started: set MONITORED_APIS to enable it");
        }
    } else {
        tracing::info!("Monitoring autostart disabled; use POST /monitoring/start");
    }

    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
