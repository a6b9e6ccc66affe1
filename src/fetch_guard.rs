//! Latest-request-wins guard
//!
//! Concurrent fetches for the same view may finish out of order. Each fetch
//! takes a ticket for its key before starting; only the holder of the most
//! recent ticket may commit its result, so a slow earlier request can never
//! overwrite a newer one.
//!
//! A key is tracked only while its newest fetch is in flight. Committing or
//! dropping the newest ticket forgets the key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Proof of having started a fetch for `key`
#[derive(Debug)]
pub struct Ticket<'a> {
    guard: &'a LatestOnly,
    key: String,
    id: u64,
}

impl Ticket<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run `write` only if this is still the newest ticket for its key.
    ///
    /// The check and the write happen under one lock, so no newer ticket
    /// can be issued in between. Returns whether `write` ran.
    pub fn commit_with<F: FnOnce()>(self, write: F) -> bool {
        let Ok(mut latest) = self.guard.latest.lock() else {
            return false;
        };
        if latest.get(&self.key) == Some(&self.id) {
            write();
            latest.remove(&self.key);
            true
        } else {
            tracing::debug!(key = %self.key, ticket = self.id, "Dropping stale result");
            false
        }
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if let Ok(mut latest) = self.guard.latest.lock() {
            if latest.get(&self.key) == Some(&self.id) {
                latest.remove(&self.key);
            }
        }
    }
}

/// Per-key monotonically increasing tickets
#[derive(Debug, Default)]
pub struct LatestOnly {
    next: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl LatestOnly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch for `key`, superseding any fetch already running
    pub fn issue(&self, key: &str) -> Ticket<'_> {
        let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut latest) = self.latest.lock() {
            latest.insert(key.to_string(), id);
        }
        Ticket {
            guard: self,
            key: key.to_string(),
            id,
        }
    }

    /// Whether `ticket` is still the newest for its key
    pub fn is_current(&self, ticket: &Ticket<'_>) -> bool {
        self.latest
            .lock()
            .map(|latest| latest.get(&ticket.key) == Some(&ticket.id))
            .unwrap_or(false)
    }

    /// Number of keys with a fetch in flight
    pub fn in_flight(&self) -> usize {
        self.latest.lock().map(|latest| latest.len()).unwrap_or(0)
    }
}
