//! scm::snapshot
//!
//! The shared, last-known status of a project.
//!
//! # Design
//!
//! Status is refreshed from two places: synchronously by `status_get` on
//! the interactive thread, and in the background by the dispatcher. Both
//! publish a fresh list into one [`StatusStore`].
//!
//! A list is never mutated after publication; readers clone an
//! `Arc<[Status]>` and keep a consistent view while a refresh replaces it.
//!
//! Each refresh takes a ticket before it starts fetching. Publishing with a
//! ticket older than the one already published is refused, so a slow fetch
//! that started first cannot overwrite a newer result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::core::types::Status;

/// One published status list.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Ticket of the refresh that produced it (0 before the first one)
    pub generation: u64,
    /// When it was published
    pub refreshed_at: Option<DateTime<Utc>>,
    /// The records, in tool order
    pub records: Arc<[Status]>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            generation: 0,
            refreshed_at: None,
            records: Arc::from(Vec::new()),
        }
    }
}

/// Holder of the current [`StatusSnapshot`].
#[derive(Debug, Default)]
pub struct StatusStore {
    next_ticket: AtomicU64,
    current: RwLock<StatusSnapshot>,
}

impl StatusStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a ticket for a refresh about to start.
    pub fn begin(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish `records` fetched under `ticket`.
    ///
    /// Returns `false` (and leaves the store untouched) if a refresh with a
    /// later ticket has already been published.
    pub fn publish(&self, ticket: u64, records: Vec<Status>) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if ticket < current.generation {
            warn!(
                ticket,
                current = current.generation,
                "discarding stale status refresh"
            );
            return false;
        }

        debug!(ticket, count = records.len(), "status published");
        *current = StatusSnapshot {
            generation: ticket,
            refreshed_at: Some(Utc::now()),
            records: Arc::from(records),
        };
        true
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current records.
    pub fn records(&self) -> Arc<[Status]> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    /// Drop the current records.
    ///
    /// The generation is kept so in-flight refreshes stay ordered.
    pub fn clear(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.records = Arc::from(Vec::new());
        current.refreshed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ChangeKind;

    fn records(paths: &[&str]) -> Vec<Status> {
        paths
            .iter()
            .map(|p| Status::new(*p, ChangeKind::Modified))
            .collect()
    }

    #[test]
    fn starts_empty() {
        let store = StatusStore::new();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.generation, 0);
        assert!(snapshot.refreshed_at.is_none());
        assert!(store.records().is_empty());
    }

    #[test]
    fn publish_replaces_records() {
        let store = StatusStore::new();

        let ticket = store.begin();
        assert!(store.publish(ticket, records(&["a", "b"])));
        assert_eq!(store.records().len(), 2);

        let ticket = store.begin();
        assert!(store.publish(ticket, records(&["c"])));
        assert_eq!(store.records()[0].path(), "c");
        assert_eq!(store.snapshot().generation, ticket);
        assert!(store.snapshot().refreshed_at.is_some());
    }

    #[test]
    fn stale_publish_is_discarded() {
        let store = StatusStore::new();
        let slow = store.begin();
        let fast = store.begin();

        assert!(store.publish(fast, records(&["new"])));
        assert!(!store.publish(slow, records(&["old"])));
        assert_eq!(store.records()[0].path(), "new");
    }

    #[test]
    fn readers_keep_their_view() {
        let store = StatusStore::new();
        store.publish(store.begin(), records(&["a"]));
        let held = store.records();

        store.publish(store.begin(), records(&["b", "c"]));

        assert_eq!(held.len(), 1);
        assert_eq!(held[0].path(), "a");
        assert_eq!(store.records().len(), 2);
    }

    #[test]
    fn clear_keeps_generation() {
        let store = StatusStore::new();
        let ticket = store.begin();
        store.publish(ticket, records(&["a"]));

        store.clear();

        assert!(store.records().is_empty());
        assert_eq!(store.snapshot().generation, ticket);
        assert!(!store.publish(ticket - 1, records(&["x"])));
    }
}
