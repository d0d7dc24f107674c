//! Ticketing subsystem.
//!
//! # Data Flow
//! ```text
//! TicketRequest (endpoint down | pushed alert)
//!     → issue.rs (build the {"fields": ...} body)
//!     → client.rs (Basic auth POST /rest/api/2/issue)
//!     → CreatedTicket { key, url } or TicketError
//! ```
//!
//! # Design Decisions
//! - Callers depend on the `TicketFiler` trait, not on Jira
//! - Filing failures are returned, never escalated

pub mod client;
pub mod issue;
pub mod types;

pub use client::JiraClient;
pub use types::{CreatedTicket, TicketError, TicketFiler, TicketRequest, TicketResult};
