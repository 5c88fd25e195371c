//! In-memory transport backed by tokio channels.
//!
//! Suitable for tests and for embedding the provider next to an in-process
//! node. The `RemoteEnd` plays the server: it sees every frame the provider
//! sends and scripts what the provider receives.

use crate::domain::error::TransportError;
use crate::ports::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::debug;

/// Provider-side half of an in-memory connection
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<Bytes>,
    inbound: Mutex<mpsc::UnboundedReceiver<Bytes>>,
    closed: AtomicBool,
    shutdown: Notify,
}

/// Server-side half of an in-memory connection
pub struct RemoteEnd {
    to_provider: mpsc::UnboundedSender<Bytes>,
    from_provider: mpsc::UnboundedReceiver<Bytes>,
}

/// Create a connected transport / remote pair
pub fn channel_pair() -> (ChannelTransport, RemoteEnd) {
    let (to_provider, inbound) = mpsc::unbounded_channel();
    let (outbound, from_provider) = mpsc::unbounded_channel();

    (
        ChannelTransport {
            outbound,
            inbound: Mutex::new(inbound),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        },
        RemoteEnd {
            to_provider,
            from_provider,
        },
    )
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    async fn receive(&self) -> Result<Bytes, TransportError> {
        // Register for shutdown before checking the flag so a concurrent
        // close cannot slip between the two.
        let shutdown = self.shutdown.notified();
        tokio::pin!(shutdown);
        shutdown.as_mut().enable();

        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        // The lock, `recv` and `Notified` are all cancel safe
        tokio::select! {
            biased;
            _ = &mut shutdown => Err(TransportError::Closed),
            frame = async { self.inbound.lock().await.recv().await } => {
                frame.ok_or(TransportError::Closed)
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Wake in-flight reads first; they release the inbound lock
            self.shutdown.notify_waiters();
            self.inbound.lock().await.close();
            debug!("Channel transport closed");
        }
        Ok(())
    }
}

impl RemoteEnd {
    /// Deliver a raw frame to the provider
    pub fn push(&self, frame: impl Into<Bytes>) -> Result<(), TransportError> {
        self.to_provider
            .send(frame.into())
            .map_err(|_| TransportError::Closed)
    }

    /// Deliver a JSON message to the provider
    pub fn push_json(&self, message: &Value) -> Result<(), TransportError> {
        let frame =
            serde_json::to_vec(message).map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.push(frame)
    }

    /// Next frame sent by the provider, `None` once the provider is gone
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        self.from_provider.recv().await
    }

    /// Next request sent by the provider, decoded as JSON
    pub async fn next_request(&mut self) -> Option<Value> {
        let frame = self.next_frame().await?;
        serde_json::from_slice(&frame).ok()
    }
}
