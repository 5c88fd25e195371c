//! Inbound message classification.
//!
//! A decoded message is a response when its `id` is a correlation id this
//! connection has issued. Everything else (no id, null id, foreign id) is
//! unsolicited.

use crate::domain::correlation::{RequestId, RequestIdGenerator};
use crate::domain::pending::PendingRequests;
use serde_json::Value;

/// Where an inbound message belongs
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Answer to a request issued on this connection
    Response {
        id: RequestId,
        payload: Value,
        /// Whether a waiter was registered for `id` at classification time.
        /// `false` means the waiter already gave up.
        awaited: bool,
    },
    /// Push or notification with no matching request
    Unsolicited(Value),
}

/// Classify a decoded inbound message
pub fn classify(payload: Value, pending: &PendingRequests, ids: &RequestIdGenerator) -> Classified {
    match payload.get("id").and_then(RequestId::from_json) {
        Some(id) if ids.issued(id) => Classified::Response {
            id,
            awaited: pending.is_pending(&id),
            payload,
        },
        _ => Classified::Unsolicited(payload),
    }
}
