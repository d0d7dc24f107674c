//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor loop (monitor.rs):
//!     Cycle start
//!     → Probe each endpoint (probe.rs)
//!     → Update its status (state.rs)
//!     → File a ticket when the dedup rule allows it
//!     → Sleep until the next cycle or shutdown
//! ```
//!
//! # Design Decisions
//! - The monitor is the only writer of endpoint state
//! - Probes never fail; every error becomes an unhealthy verdict
//! - A single loop per process, enforced with a compare-and-swap

pub mod monitor;
pub mod probe;
pub mod state;

pub use monitor::{CycleReport, Monitor, StartOutcome};
pub use probe::{HealthProbe, HttpProber, ProbeOutcome};
pub use state::{EndpointState, EndpointStatus, EndpointStore};
