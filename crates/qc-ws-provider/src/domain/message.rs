//! JSON-RPC request and response envelopes.

use crate::domain::correlation::RequestId;
use crate::domain::error::{ProviderError, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version sent on every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Outbound JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A successful response, matched to the request that solicited it.
///
/// The full decoded payload is kept as received so callers can inspect
/// members this layer does not know about.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    id: RequestId,
    payload: Value,
}

impl RpcResponse {
    /// Turn a matched payload into a response, or a protocol error when the
    /// payload carries a non-null `error` member.
    pub fn from_payload(id: RequestId, payload: Value) -> Result<Self, ProviderError> {
        match payload.get("error") {
            Some(error) if !error.is_null() => Err(ProviderError::Protocol {
                id,
                error: RpcError::from_value(error),
            }),
            _ => Ok(Self { id, payload }),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The `result` member, or `Value::Null` when absent
    pub fn result(&self) -> &Value {
        self.payload.get("result").unwrap_or(&Value::Null)
    }

    /// The full decoded message
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}
