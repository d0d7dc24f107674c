//! HTTP surface of the bridge.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → handlers.rs (status queries, manual start, alert webhook)
//!     → error.rs (JSON error bodies)
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ServerError};
pub use server::{AppState, HttpServer};
