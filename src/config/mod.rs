//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (+ optional .env file)
//!     → loader.rs (parse variables into typed sections)
//!     → validation.rs (semantic checks, all errors reported)
//!     → BridgeConfig (validated, immutable)
//!     → shared via Arc with the HTTP server and the monitor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - Every section has defaults; only the Jira credentials are required
//! - Parsing errors (bad numbers) are separate from semantic validation

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    endpoint_key, BridgeConfig, JiraConfig, LogFormat, MonitoredEndpoint, MonitoringConfig,
    ObservabilityConfig, ServerConfig, TicketDedupPolicy, TicketTemplateConfig, WebhookConfig,
};
