//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the prober, the ticket filer and the monitor from configuration
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Render middleware failures as JSON errors
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::BridgeConfig;
use crate::health::{HttpProber, Monitor};
use crate::http::error::{render_timeout, ServerError};
use crate::http::handlers;
use crate::lifecycle::Shutdown;
use crate::ticketing::{JiraClient, TicketFiler};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BridgeConfig>,
    pub monitor: Arc<Monitor>,
    pub filer: Arc<dyn TicketFiler>,
}

/// HTTP server for the bridge.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server with the production prober and Jira client.
    pub fn new(config: BridgeConfig, shutdown: Shutdown) -> Result<Self, ServerError> {
        let prober = HttpProber::new(Duration::from_secs(config.monitoring.timeout_secs))?;
        let filer: Arc<dyn TicketFiler> =
            Arc::new(JiraClient::new(config.jira.clone(), config.tickets.clone())?);

        let monitor = Arc::new(Monitor::new(
            config.monitoring.clone(),
            Arc::new(prober),
            filer.clone(),
            shutdown,
        ));

        Ok(Self::with_components(config, monitor, filer))
    }

    /// Create a server around an existing monitor and filer.
    pub fn with_components(
        config: BridgeConfig,
        monitor: Arc<Monitor>,
        filer: Arc<dyn TicketFiler>,
    ) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            config: config.clone(),
            monitor,
            filer,
        };

        let router = Self::build_router(&config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BridgeConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health))
            .route("/monitoring/status", get(handlers::monitoring_status))
            .route("/monitoring/start", post(handlers::start_monitoring));

        if config.webhook.enabled {
            router = router.route("/webhook/prometheus", post(handlers::prometheus_webhook));
        }

        router
            .fallback(handlers::not_found)
            .method_not_allowed_fallback(handlers::method_not_allowed)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(middleware::map_response(render_timeout))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.server.request_timeout_secs,
                    )))
                    .layer(DefaultBodyLimit::max(config.server.max_body_bytes)),
            )
    }

    pub fn monitor(&self) -> Arc<Monitor> {
        self.state.monitor.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
