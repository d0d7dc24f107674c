//! Endpoint health state machine and the in-memory store.
//!
//! # States
//! - Unknown: never probed successfully or unsuccessfully yet
//! - Up: last probe succeeded
//! - Down: last probe failed
//!
//! # Ticket dedup rule
//! ```text
//! on failure: should_file = previous != Down || consecutive_failures >= threshold
//!             file only if should_file and no ticket filed yet for this endpoint
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::config::TicketDedupPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointState {
    #[default]
    Unknown,
    Up,
    Down,
}

/// Last-known health of one monitored endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub name: String,
    pub status: EndpointState,
    pub consecutive_failures: u32,
    pub last_checked_at: DateTime<Utc>,
    pub last_ticket_filed_at: Option<DateTime<Utc>>,
    pub last_message: String,
    pub last_ticket_key: Option<String>,
}

impl EndpointStatus {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            status: EndpointState::Unknown,
            consecutive_failures: 0,
            last_checked_at: now,
            last_ticket_filed_at: None,
            last_message: String::new(),
            last_ticket_key: None,
        }
    }

    /// Record a successful probe. Returns true when the endpoint recovered from Down.
    pub fn record_success(
        &mut self,
        now: DateTime<Utc>,
        message: &str,
        policy: TicketDedupPolicy,
    ) -> bool {
        let recovered = self.status == EndpointState::Down;

        self.last_checked_at = now;
        self.last_message = message.to_string();
        self.status = EndpointState::Up;
        self.consecutive_failures = 0;

        if recovered && policy == TicketDedupPolicy::ResetOnRecovery {
            self.last_ticket_filed_at = None;
        }

        recovered
    }

    /// Record a failed probe. Returns true when a ticket should be filed now.
    pub fn record_failure(&mut self, now: DateTime<Utc>, message: &str, threshold: u32) -> bool {
        self.last_checked_at = now;
        self.last_message = message.to_string();
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        let should_file =
            self.status != EndpointState::Down || self.consecutive_failures >= threshold;
        let file_now = should_file && self.last_ticket_filed_at.is_none();

        self.status = EndpointState::Down;
        file_now
    }

    pub fn mark_ticket_filed(&mut self, now: DateTime<Utc>, ticket_key: &str) {
        self.last_ticket_filed_at = Some(now);
        self.last_ticket_key = Some(ticket_key.to_string());
    }
}

/// Shared map from endpoint key to its status.
///
/// The monitoring loop is the only writer; request handlers take snapshots.
#[derive(Clone, Default)]
pub struct EndpointStore {
    inner: Arc<DashMap<String, EndpointStatus>>,
}

impl EndpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to the endpoint's status, creating it on first use.
    ///
    /// The map shard stays locked while `f` runs, so `f` must not block.
    pub fn update<R>(
        &self,
        key: &str,
        name: &str,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut EndpointStatus) -> R,
    ) -> R {
        let mut entry = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| EndpointStatus::new(name, now));
        f(entry.value_mut())
    }

    pub fn mark_ticket_filed(&self, key: &str, now: DateTime<Utc>, ticket_key: &str) {
        if let Some(mut status) = self.inner.get_mut(key) {
            status.mark_ticket_filed(now, ticket_key);
        }
    }

    pub fn get(&self, key: &str) -> Option<EndpointStatus> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    /// Copy of every status, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, EndpointStatus> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> EndpointStatus {
        EndpointStatus::new("orders", Utc::now())
    }

    #[test]
    fn test_first_failure_files_ticket() {
        let mut s = status();
        assert!(s.record_failure(Utc::now(), "HTTP 500", 3));
        assert_eq!(s.status, EndpointState::Down);
        assert_eq!(s.consecutive_failures, 1);
    }

    #[test]
    fn test_filed_ticket_blocks_duplicates() {
        let mut s = status();
        assert!(s.record_failure(Utc::now(), "HTTP 500", 3));
        s.mark_ticket_filed(Utc::now(), "OPS-1");

        assert!(!s.record_failure(Utc::now(), "HTTP 500", 3));
        assert!(!s.record_failure(Utc::now(), "HTTP 500", 3));
        assert!(!s.record_failure(Utc::now(), "HTTP 500", 3));
        assert_eq!(s.consecutive_failures, 4);
        assert_eq!(s.last_ticket_key.as_deref(), Some("OPS-1"));
    }

    #[test]
    fn test_unfiled_down_endpoint_waits_for_threshold() {
        let mut s = status();
        // First failure qualified but the filing failed: nothing marked.
        assert!(s.record_failure(Utc::now(), "Timeout", 3));
        assert!(!s.record_failure(Utc::now(), "Timeout", 3));
        assert!(s.record_failure(Utc::now(), "Timeout", 3));
    }

    #[test]
    fn test_success_resets_failures() {
        let mut s = status();
        s.record_failure(Utc::now(), "HTTP 500", 3);
        s.record_failure(Utc::now(), "HTTP 500", 3);

        let recovered = s.record_success(Utc::now(), "API UP", TicketDedupPolicy::OncePerProcess);
        assert!(recovered);
        assert_eq!(s.status, EndpointState::Up);
        assert_eq!(s.consecutive_failures, 0);

        let recovered = s.record_success(Utc::now(), "API UP", TicketDedupPolicy::OncePerProcess);
        assert!(!recovered);
    }

    #[test]
    fn test_once_per_process_keeps_guard_after_recovery() {
        let mut s = status();
        s.record_failure(Utc::now(), "HTTP 500", 3);
        s.mark_ticket_filed(Utc::now(), "OPS-1");
        s.record_success(Utc::now(), "API UP", TicketDedupPolicy::OncePerProcess);

        assert!(s.last_ticket_filed_at.is_some());
        assert!(!s.record_failure(Utc::now(), "HTTP 500", 3));
    }

    #[test]
    fn test_reset_on_recovery_clears_guard() {
        let mut s = status();
        s.record_failure(Utc::now(), "HTTP 500", 3);
        s.mark_ticket_filed(Utc::now(), "OPS-1");
        s.record_success(Utc::now(), "API UP", TicketDedupPolicy::ResetOnRecovery);

        assert!(s.last_ticket_filed_at.is_none());
        assert!(s.record_failure(Utc::now(), "HTTP 500", 3));
    }

    #[test]
    fn test_store_creates_lazily_and_snapshots() {
        let store = EndpointStore::new();
        assert!(store.is_empty());

        let now = Utc::now();
        let file = store.update("http://b", "B", now, |s| s.record_failure(now, "Timeout", 3));
        assert!(file);
        store.update("http://a", "A", now, |s| {
            s.record_success(now, "API UP", TicketDedupPolicy::OncePerProcess)
        });
        store.mark_ticket_filed("http://b", now, "OPS-7");

        let snapshot = store.snapshot();
        let keys: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(keys, vec!["http://a", "http://b"]);
        assert_eq!(snapshot["http://a"].status, EndpointState::Up);
        assert_eq!(store.get("http://b").unwrap().last_ticket_key.as_deref(), Some("OPS-7"));
    }
}
