//! Correlation IDs for request tracking.
//!
//! Request ids are small integers handed out per connection, starting at 0.
//! Connections are tagged with a UUID v7 so that log lines from several
//! providers in one process can be told apart.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Correlation ID carried by a request and its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Create from a raw counter value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw counter value
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Read a request id out of the `id` member of a decoded message.
    ///
    /// Accepts unsigned JSON numbers and decimal strings. Anything else
    /// (null, negative, fractional, objects) is not a correlation id.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().map(Self),
            serde_json::Value::String(s) => s.parse::<u64>().ok().map(Self),
            _ => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RequestId> for u64 {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// Monotonic request id source, one per connection.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl RequestIdGenerator {
    /// Create a generator whose first id is 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id. Safe under concurrent callers.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// Whether `id` has already been handed out on this connection.
    pub fn issued(&self, id: RequestId) -> bool {
        id.0 < self.next.load(Ordering::SeqCst)
    }

    /// Number of ids handed out so far
    pub fn issued_count(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

/// Connection tag used in log fields.
///
/// Uses UUID v7 which is time-ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new connection ID (UUID v7)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_first_id_is_zero() {
        let ids = RequestIdGenerator::new();
        assert_eq!(ids.next_id(), RequestId::new(0));
        assert_eq!(ids.next_id(), RequestId::new(1));
    }

    #[test]
    fn test_issued_tracks_handed_out_ids() {
        let ids = RequestIdGenerator::new();
        assert!(!ids.issued(RequestId::new(0)));

        let first = ids.next_id();
        assert!(ids.issued(first));
        assert!(!ids.issued(RequestId::new(1)));
        assert_eq!(ids.issued_count(), 1);
    }

    #[test]
    fn test_concurrent_ids_are_distinct() {
        let ids = Arc::new(RequestIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 2000);
        assert_eq!(ids.issued_count(), 2000);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(RequestId::from_json(&json!(7)), Some(RequestId::new(7)));
        assert_eq!(RequestId::from_json(&json!("12")), Some(RequestId::new(12)));
        assert_eq!(RequestId::from_json(&json!(null)), None);
        assert_eq!(RequestId::from_json(&json!(-1)), None);
        assert_eq!(RequestId::from_json(&json!(1.5)), None);
        assert_eq!(RequestId::from_json(&json!("0x1")), None);
        assert_eq!(RequestId::from_json(&json!({"id": 1})), None);
    }

    #[test]
    fn test_request_id_serializes_as_number() {
        let json = serde_json::to_string(&RequestId::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new();
        assert_eq!(id.to_string().len(), 36);
        assert_ne!(id, ConnectionId::new());
    }

    proptest! {
        #[test]
        fn prop_ids_strictly_increase(count in 1usize..512) {
            let ids = RequestIdGenerator::new();
            let issued: Vec<_> = (0..count).map(|_| ids.next_id()).collect();
            prop_assert!(issued.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(issued.len(), count);
        }
    }
}
