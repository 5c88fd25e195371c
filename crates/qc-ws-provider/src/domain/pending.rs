//! Pending request registry.
//!
//! Tracks which request ids currently have a waiter, so the classifier can
//! tell an awaited response from a late one.

use crate::domain::correlation::RequestId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// A request waiting for its response
#[derive(Debug)]
struct PendingRequest {
    /// When request was sent
    created_at: Instant,
    /// Method name (for logging)
    method: String,
}

/// Counters for one provider connection
#[derive(Debug, Default)]
pub struct ProviderStats {
    /// Requests written to the transport
    pub requests_sent: AtomicU64,
    /// Requests that received a successful response
    pub requests_completed: AtomicU64,
    /// Responses carrying an `error` member
    pub protocol_errors: AtomicU64,
    /// Requests that gave up waiting
    pub timeouts: AtomicU64,
    /// Requests aborted by a send or receive failure
    pub transport_errors: AtomicU64,
    /// Responses routed into the response cache
    pub responses_cached: AtomicU64,
    /// Messages routed into the unsolicited buffer
    pub unsolicited_received: AtomicU64,
}

impl ProviderStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            responses_cached: self.responses_cached.load(Ordering::Relaxed),
            unsolicited_received: self.unsolicited_received.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`ProviderStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatsSnapshot {
    pub requests_sent: u64,
    pub requests_completed: u64,
    pub protocol_errors: u64,
    pub timeouts: u64,
    pub transport_errors: u64,
    pub responses_cached: u64,
    pub unsolicited_received: u64,
}

/// Registry of request ids that currently have a waiter.
///
/// Flow:
/// 1. Coordinator allocates an id and calls `register()`
/// 2. Coordinator sends the request and waits
/// 3. The returned guard removes the entry when the wait ends, whether by
///    response, timeout, transport failure or the caller dropping the future
#[derive(Debug, Default)]
pub struct PendingRequests {
    pending: DashMap<RequestId, PendingRequest>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id`
    pub fn register(&self, id: RequestId, method: &str) -> PendingGuard<'_> {
        self.pending.insert(
            id,
            PendingRequest {
                created_at: Instant::now(),
                method: method.to_string(),
            },
        );

        debug!(request_id = %id, method = method, "Registered pending request");

        PendingGuard { store: self, id }
    }

    /// Remove the waiter for `id`, returning how long it waited.
    ///
    /// Returns `None` if the id was not pending.
    pub fn complete(&self, id: RequestId) -> Option<Duration> {
        self.pending.remove(&id).map(|(_, request)| {
            let response_time = request.created_at.elapsed();
            debug!(
                request_id = %id,
                method = request.method,
                response_time_ms = response_time.as_millis(),
                "Completed pending request"
            );
            response_time
        })
    }

    /// Check if an id currently has a waiter
    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.pending.contains_key(id)
    }

    /// Method name of a pending request
    pub fn method(&self, id: &RequestId) -> Option<String> {
        self.pending.get(id).map(|r| r.method.clone())
    }

    /// Get number of currently pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn cancel(&self, id: &RequestId) -> bool {
        self.pending.remove(id).is_some()
    }
}

/// Removes its id from the registry on drop
#[derive(Debug)]
pub struct PendingGuard<'a> {
    store: &'a PendingRequests,
    id: RequestId,
}

impl PendingGuard<'_> {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.store.cancel(&self.id) {
            debug!(request_id = %self.id, "Pending request abandoned");
        }
    }
}
