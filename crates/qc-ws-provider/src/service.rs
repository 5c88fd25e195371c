//! WebSocket provider - request coordinator over a persistent transport.
//!
//! One `WsProvider` owns one connection: its id generator, pending registry,
//! response cache and unsolicited buffer. All requests on the connection
//! share the single inbound stream.
//!
//! # Request lifecycle
//!
//! ```text
//! ALLOCATED ──send──▶ AWAITING_MATCH ──match──▶ SATISFIED
//!     │                     │
//!     └─send fails          └─deadline──▶ TIMED_OUT
//! ```
//!
//! While awaiting, each iteration checks the response cache, then takes the
//! reader slot and performs one bounded read. Whatever is read is routed to
//! the caller, the response cache or the unsolicited buffer.

use crate::adapters::JsonCodec;
use crate::domain::classifier::{classify, Classified};
use crate::domain::config::{ConfigError, ProviderConfig};
use crate::domain::correlation::{ConnectionId, RequestId, RequestIdGenerator};
use crate::domain::error::{ProviderError, ProviderResult, TransportError};
use crate::domain::message::{RpcRequest, RpcResponse};
use crate::domain::pending::{PendingRequests, ProviderStats, StatsSnapshot};
use crate::domain::{ResponseCache, UnsolicitedBuffer};
use crate::ports::{MessageCodec, Transport};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

/// Deadlines past this horizon are treated as "wait forever".
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Absolute deadline for a wait of `timeout`, saturating on overflow.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Builder for [`WsProvider`]
pub struct WsProviderBuilder {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn MessageCodec>,
    config: ProviderConfig,
}

impl WsProviderBuilder {
    pub fn config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn codec(mut self, codec: impl MessageCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Default timeout applied when a request passes `None`
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<WsProvider, ConfigError> {
        self.config.validate()?;

        let connection_id = ConnectionId::new();
        info!(
            connection_id = %connection_id,
            endpoint = %self.config.endpoint,
            request_timeout_ms = self.config.request_timeout.as_millis(),
            "Created WebSocket provider"
        );

        Ok(WsProvider {
            connection_id,
            transport: self.transport,
            codec: self.codec,
            ids: RequestIdGenerator::new(),
            pending: PendingRequests::new(),
            responses: ResponseCache::new(self.config.response_cache_size),
            unsolicited: UnsolicitedBuffer::new(self.config.unsolicited_buffer_size),
            reader: Mutex::new(()),
            stats: ProviderStats::default(),
            closed: AtomicBool::new(false),
            config: self.config,
        })
    }
}

/// Request/response correlation over one persistent connection
pub struct WsProvider {
    connection_id: ConnectionId,
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn MessageCodec>,
    ids: RequestIdGenerator,
    pending: PendingRequests,
    responses: ResponseCache,
    unsolicited: UnsolicitedBuffer,
    /// Held across exactly one transport read
    reader: Mutex<()>,
    stats: ProviderStats,
    closed: AtomicBool,
}

impl WsProvider {
    pub fn builder(transport: impl Transport + 'static) -> WsProviderBuilder {
        Self::builder_shared(Arc::new(transport))
    }

    /// Builder for a transport that is also used elsewhere
    pub fn builder_shared(transport: Arc<dyn Transport>) -> WsProviderBuilder {
        WsProviderBuilder {
            transport,
            codec: Arc::new(JsonCodec),
            config: ProviderConfig::default(),
        }
    }

    /// Provider with the JSON codec and the given config
    pub fn new(
        transport: impl Transport + 'static,
        config: ProviderConfig,
    ) -> Result<Self, ConfigError> {
        Self::builder(transport).config(config).build()
    }

    /// Allocate the next correlation id on this connection
    pub fn next_id(&self) -> RequestId {
        self.ids.next_id()
    }

    /// Send `method` and wait for its response.
    ///
    /// `timeout` falls back to the configured request timeout. A response
    /// that is already cached is returned without touching the transport,
    /// even with a zero timeout.
    pub async fn make_request(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> ProviderResult<RpcResponse> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::Closed);
        }

        let timeout = timeout.unwrap_or(self.config.request_timeout);
        let id = self.ids.next_id();
        let _pending = self.pending.register(id, method);

        let outcome = match self.send_request(id, method, params).await {
            Ok(()) => self.await_response(id, timeout).await,
            Err(e) => Err(e),
        };

        self.pending.complete(id);
        self.record_outcome(id, method, &outcome);
        outcome
    }

    /// Seed a raw response.
    ///
    /// A message with a correlation id goes to the response cache under that
    /// id. Anything else goes to the unsolicited buffer.
    pub fn cache_raw_response(&self, payload: Value) {
        match payload.get("id").and_then(RequestId::from_json) {
            Some(id) => {
                ProviderStats::incr(&self.stats.responses_cached);
                self.responses.cache(id, payload);
            }
            None => {
                ProviderStats::incr(&self.stats.unsolicited_received);
                self.unsolicited.push(payload);
            }
        }
    }

    /// Remove and return every buffered unsolicited message, oldest first
    pub fn drain_unsolicited(&self) -> Vec<Value> {
        self.unsolicited.drain_all()
    }

    /// Remove and return the oldest buffered unsolicited message
    pub fn pop_unsolicited(&self) -> Option<Value> {
        self.unsolicited.pop_front()
    }

    /// Wait for the next unsolicited message.
    ///
    /// Returns a buffered message immediately if there is one. Otherwise
    /// reads the transport, caching any responses seen on the way, until an
    /// unsolicited message arrives. Returns `Ok(None)` when `timeout`
    /// elapses first.
    pub async fn next_unsolicited(&self, timeout: Duration) -> ProviderResult<Option<Value>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::Closed);
        }

        let deadline = deadline_after(timeout);
        loop {
            if let Some(message) = self.unsolicited.pop_front() {
                return Ok(Some(message));
            }

            let Ok(_reader) = time::timeout_at(deadline, self.reader.lock()).await else {
                return Ok(None);
            };
            if let Some(message) = self.unsolicited.pop_front() {
                return Ok(Some(message));
            }

            let Some(message) = self.read_message(deadline).await? else {
                return Ok(None);
            };
            self.route(message, None);
        }
    }

    /// Close the transport and drop all cached state
    pub async fn disconnect(&self) -> ProviderResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let result = self.transport.close().await;
        self.responses.clear();
        self.unsolicited.clear();

        info!(connection_id = %self.connection_id, "Disconnected WebSocket provider");
        result.map_err(ProviderError::from)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn response_cache(&self) -> &ResponseCache {
        &self.responses
    }

    pub fn unsolicited_buffer(&self) -> &UnsolicitedBuffer {
        &self.unsolicited
    }

    /// Get number of requests currently awaiting a response
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.is_pending(&id)
    }

    /// Get statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    async fn send_request(&self, id: RequestId, method: &str, params: Value) -> ProviderResult<()> {
        let request = RpcRequest::new(id, method, params);
        let message = serde_json::to_value(&request)
            .map_err(|e| ProviderError::Encode(e.into()))?;
        let frame = self.codec.encode(&message).map_err(ProviderError::Encode)?;

        self.transport.send(frame).await?;
        ProviderStats::incr(&self.stats.requests_sent);

        debug!(
            connection_id = %self.connection_id,
            request_id = %id,
            method = method,
            "Sent request"
        );
        Ok(())
    }

    async fn await_response(&self, id: RequestId, timeout: Duration) -> ProviderResult<RpcResponse> {
        let deadline = deadline_after(timeout);

        loop {
            if let Some(payload) = self.responses.take(id) {
                debug!(request_id = %id, "Response served from cache");
                return RpcResponse::from_payload(id, payload);
            }

            let timed_out = ProviderError::Timeout { id, timeout };
            if Instant::now() >= deadline {
                return Err(timed_out);
            }

            let Ok(_reader) = time::timeout_at(deadline, self.reader.lock()).await else {
                return Err(timed_out);
            };
            // Whoever held the reader slot may have routed our response
            if let Some(payload) = self.responses.take(id) {
                debug!(request_id = %id, "Response served from cache");
                return RpcResponse::from_payload(id, payload);
            }

            let Some(message) = self.read_message(deadline).await? else {
                return Err(timed_out);
            };
            if let Some(payload) = self.route(message, Some(id)) {
                return RpcResponse::from_payload(id, payload);
            }
        }
    }

    /// One bounded transport read. `Ok(None)` means the deadline passed.
    ///
    /// Callers must hold the reader slot.
    async fn read_message(&self, deadline: Instant) -> ProviderResult<Option<Value>> {
        let frame = match time::timeout_at(deadline, self.transport.receive()).await {
            Ok(frame) => frame?,
            Err(_) => return Ok(None),
        };

        self.codec
            .decode(&frame)
            .map(Some)
            .map_err(|e| TransportError::Malformed(e.to_string()).into())
    }

    /// Route a decoded message. Returns the payload if it answers `wanted`.
    fn route(&self, message: Value, wanted: Option<RequestId>) -> Option<Value> {
        match classify(message, &self.pending, &self.ids) {
            Classified::Response { id, payload, .. } if Some(id) == wanted => Some(payload),
            Classified::Response {
                id,
                payload,
                awaited,
            } => {
                if awaited {
                    debug!(
                        request_id = %id,
                        method = ?self.pending.method(&id),
                        "Response for another waiter, caching"
                    );
                } else {
                    warn!(
                        connection_id = %self.connection_id,
                        request_id = %id,
                        "Late response for abandoned request, caching"
                    );
                }
                ProviderStats::incr(&self.stats.responses_cached);
                self.responses.cache(id, payload);
                None
            }
            Classified::Unsolicited(payload) => {
                ProviderStats::incr(&self.stats.unsolicited_received);
                self.unsolicited.push(payload);
                None
            }
        }
    }

    fn record_outcome(&self, id: RequestId, method: &str, outcome: &ProviderResult<RpcResponse>) {
        match outcome {
            Ok(_) => ProviderStats::incr(&self.stats.requests_completed),
            Err(ProviderError::Protocol { error, .. }) => {
                ProviderStats::incr(&self.stats.protocol_errors);
                debug!(request_id = %id, method = method, error = %error, "Request returned an error");
            }
            Err(ProviderError::Timeout { timeout, .. }) => {
                ProviderStats::incr(&self.stats.timeouts);
                warn!(
                    connection_id = %self.connection_id,
                    request_id = %id,
                    method = method,
                    timeout_ms = timeout.as_millis(),
                    "Request timed out"
                );
            }
            Err(ProviderError::Transport(e)) => {
                ProviderStats::incr(&self.stats.transport_errors);
                error!(
                    connection_id = %self.connection_id,
                    request_id = %id,
                    method = method,
                    error = %e,
                    "Transport failure, aborting request"
                );
            }
            Err(e) => {
                error!(request_id = %id, method = method, error = %e, "Request failed");
            }
        }
    }
}
