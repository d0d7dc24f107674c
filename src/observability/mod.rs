//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! probes, monitor, ticketing, HTTP handlers
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
