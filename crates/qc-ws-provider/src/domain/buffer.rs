//! Unsolicited message buffer.
//!
//! FIFO of messages that did not answer any request issued on the
//! connection, typically subscription pushes. Bounded with a drop-oldest
//! policy: every drop is logged and counted.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Bounded arrival-ordered buffer of unsolicited messages
#[derive(Debug)]
pub struct UnsolicitedBuffer {
    messages: Mutex<VecDeque<Value>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl UnsolicitedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Append a message, dropping the oldest one when full.
    ///
    /// Returns the dropped message, if any.
    pub fn push(&self, message: Value) -> Option<Value> {
        let mut messages = self.messages.lock();
        let dropped = if messages.len() >= self.capacity {
            messages.pop_front()
        } else {
            None
        };
        messages.push_back(message);
        drop(messages);

        if dropped.is_some() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                capacity = self.capacity,
                total_dropped = total,
                "Unsolicited buffer full, dropped oldest message"
            );
        }
        dropped
    }

    /// Remove and return everything buffered, oldest first
    pub fn drain_all(&self) -> Vec<Value> {
        let drained = std::mem::take(&mut *self.messages.lock());
        Vec::from(drained)
    }

    /// Remove and return the oldest message
    pub fn pop_front(&self) -> Option<Value> {
        self.messages.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total messages dropped by the size bound
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_drain_returns_arrival_order() {
        let buffer = UnsolicitedBuffer::new(10);
        for i in 0..3 {
            buffer.push(json!({"seq": i}));
        }

        let drained = buffer.drain_all();
        assert_eq!(drained, vec![json!({"seq": 0}), json!({"seq": 1}), json!({"seq": 2})]);
        assert!(buffer.is_empty());
        assert!(buffer.drain_all().is_empty());
    }

    #[test]
    fn test_full_buffer_drops_oldest() {
        let buffer = UnsolicitedBuffer::new(2);
        assert_eq!(buffer.push(json!(1)), None);
        assert_eq!(buffer.push(json!(2)), None);
        assert_eq!(buffer.push(json!(3)), Some(json!(1)));

        assert_eq!(buffer.dropped(), 1);
        assert_eq!(buffer.drain_all(), vec![json!(2), json!(3)]);
    }

    #[test]
    fn test_pop_front() {
        let buffer = UnsolicitedBuffer::new(4);
        buffer.push(json!("a"));
        buffer.push(json!("b"));

        assert_eq!(buffer.pop_front(), Some(json!("a")));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.pop_front(), Some(json!("b")));
        assert_eq!(buffer.pop_front(), None);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let buffer = UnsolicitedBuffer::new(4);
        buffer.push(json!("same"));
        buffer.push(json!("same"));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_concurrent_push_and_drain_lose_nothing() {
        let buffer = Arc::new(UnsolicitedBuffer::new(10_000));

        let pusher = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for i in 0..1000u64 {
                    buffer.push(json!(i));
                }
            })
        };

        let mut collected = Vec::new();
        while !pusher.is_finished() {
            collected.extend(buffer.drain_all());
        }
        pusher.join().unwrap();
        collected.extend(buffer.drain_all());

        let expected: Vec<_> = (0..1000u64).map(|i| json!(i)).collect();
        assert_eq!(collected, expected);
    }

    proptest! {
        #[test]
        fn prop_keeps_newest_in_order(values in proptest::collection::vec(any::<u32>(), 0..64), cap in 1usize..16) {
            let buffer = UnsolicitedBuffer::new(cap);
            for v in &values {
                buffer.push(json!(v));
            }

            let expected: Vec<_> = values
                .iter()
                .skip(values.len().saturating_sub(cap))
                .map(|v| json!(v))
                .collect();
            prop_assert_eq!(buffer.dropped() as usize, values.len().saturating_sub(cap));
            prop_assert_eq!(buffer.drain_all(), expected);
        }
    }
}
