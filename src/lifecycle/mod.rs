//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server drains → monitor loop exits → process ends
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
