//! Response cache.
//!
//! Holds responses that were read off the transport before (or after) the
//! request that owns them looked for them. Bounded: once `capacity` ids are
//! held, inserting a new id evicts the oldest entry. Overwriting an id that
//! is already cached refreshes its age and never evicts.

use crate::domain::correlation::RequestId;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct CacheInner {
    /// id -> (insertion sequence, payload)
    entries: HashMap<RequestId, (u64, Value)>,
    /// insertion sequence -> id, oldest first
    order: BTreeMap<u64, RequestId>,
    next_seq: u64,
}

/// Bounded id -> response map with exactly-once `take`
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    evicted: AtomicU64,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
            evicted: AtomicU64::new(0),
        }
    }

    /// Store `payload` under `id`, replacing any existing entry.
    ///
    /// Returns the id that was evicted to make room, if any.
    pub fn cache(&self, id: RequestId, payload: Value) -> Option<RequestId> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let seq = inner.next_seq;
        inner.next_seq += 1;

        if let Some((old_seq, _)) = inner.entries.insert(id, (seq, payload)) {
            inner.order.remove(&old_seq);
            inner.order.insert(seq, id);
            debug!(request_id = %id, "Replaced cached response");
            return None;
        }
        inner.order.insert(seq, id);

        if inner.entries.len() <= self.capacity {
            return None;
        }

        let (_, oldest) = inner.order.pop_first()?;
        inner.entries.remove(&oldest);
        self.evicted.fetch_add(1, Ordering::Relaxed);
        warn!(
            request_id = %oldest,
            capacity = self.capacity,
            "Response cache full, evicted oldest unconsumed response"
        );
        Some(oldest)
    }

    /// Remove and return the response for `id`, if cached
    pub fn take(&self, id: RequestId) -> Option<Value> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let (seq, payload) = inner.entries.remove(&id)?;
        inner.order.remove(&seq);
        Some(payload)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.inner.lock().entries.contains_key(&id)
    }

    /// Number of cached responses
    pub fn size(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries dropped by the size bound
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn id(n: u64) -> RequestId {
        RequestId::new(n)
    }

    #[test]
    fn test_take_is_exactly_once() {
        let cache = ResponseCache::new(10);
        cache.cache(id(0), json!({"id": 0, "result": "0x1337"}));

        assert_eq!(cache.take(id(0)), Some(json!({"id": 0, "result": "0x1337"})));
        assert_eq!(cache.take(id(0)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_take_missing_is_absent() {
        let cache = ResponseCache::new(10);
        assert_eq!(cache.take(id(3)), None);
    }

    #[test]
    fn test_overwrite_keeps_one_entry() {
        let cache = ResponseCache::new(10);
        cache.cache(id(1), json!({"id": 1, "result": "first"}));
        cache.cache(id(1), json!({"id": 1, "result": "second"}));

        assert_eq!(cache.size(), 1);
        assert_eq!(cache.take(id(1)), Some(json!({"id": 1, "result": "second"})));
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let cache = ResponseCache::new(2);
        assert_eq!(cache.cache(id(0), json!(0)), None);
        assert_eq!(cache.cache(id(1), json!(1)), None);
        assert_eq!(cache.cache(id(2), json!(2)), Some(id(0)));

        assert_eq!(cache.size(), 2);
        assert!(!cache.contains(id(0)));
        assert!(cache.contains(id(1)));
        assert!(cache.contains(id(2)));
        assert_eq!(cache.evicted(), 1);
    }

    #[test]
    fn test_overwrite_refreshes_age() {
        let cache = ResponseCache::new(2);
        cache.cache(id(0), json!(0));
        cache.cache(id(1), json!(1));
        // id 0 becomes the newest entry
        assert_eq!(cache.cache(id(0), json!("again")), None);

        assert_eq!(cache.cache(id(2), json!(2)), Some(id(1)));
        assert_eq!(cache.take(id(0)), Some(json!("again")));
    }

    #[test]
    fn test_taken_entries_do_not_count_toward_capacity() {
        let cache = ResponseCache::new(2);
        cache.cache(id(0), json!(0));
        cache.cache(id(1), json!(1));
        cache.take(id(0));

        assert_eq!(cache.cache(id(2), json!(2)), None);
        assert_eq!(cache.evicted(), 0);
    }

    #[test]
    fn test_concurrent_take_yields_single_winner() {
        let cache = Arc::new(ResponseCache::new(10));
        cache.cache(id(7), json!("payload"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.take(id(7)).is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::new(4);
        cache.cache(id(0), json!(0));
        cache.cache(id(1), json!(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.cache(id(2), json!(2)), None);
    }
}
