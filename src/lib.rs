//! Health-check to issue-tracker bridge.
//!
//! Polls Spring Boot style health endpoints, files a Jira ticket when one goes
//! down, and turns Alertmanager webhook notifications into tickets.

pub mod alerts;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod ticketing;

pub use config::BridgeConfig;
pub use health::Monitor;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
