//! Provider error types.
//!
//! `RpcError` mirrors the JSON-RPC 2.0 error object returned by the remote
//! node. `ProviderError` is what callers of the provider see.

use crate::domain::correlation::RequestId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Standard JSON-RPC 2.0 error codes
pub mod codes {
    // JSON-RPC 2.0 standard errors (-32700 to -32600)
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// JSON-RPC error object carried in a response's `error` member
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    /// JSON-RPC error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Optional additional data
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new RPC error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create error with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Build from the raw `error` member of a response.
    ///
    /// Nodes do not always send a well-formed error object. Anything that
    /// does not deserialize is kept verbatim in `data` under an internal
    /// error code.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match serde_json::from_value::<RpcError>(value.clone()) {
            Ok(error) => error,
            Err(_) => Self::with_data(
                codes::INTERNAL_ERROR,
                format!("malformed error object: {}", value),
                value.clone(),
            ),
        }
    }

    pub fn is_method_not_found(&self) -> bool {
        self.code == codes::METHOD_NOT_FOUND
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

impl Serialize for RpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let len = if self.data.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("RpcError", len)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for RpcError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ErrorHelper {
            code: i32,
            message: String,
            data: Option<serde_json::Value>,
        }

        let helper = ErrorHelper::deserialize(deserializer)?;
        Ok(RpcError {
            code: helper.code,
            message: helper.message,
            data: helper.data,
        })
    }
}

/// Transport failures: send, receive, disconnect, undecodable frames
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("malformed inbound message: {0}")]
    Malformed(String),
}

/// Message codec failures
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
}

/// Errors returned by the provider's public operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Send, receive or disconnect failure. Fatal to the in-flight request.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response carried an `error` member
    #[error("request `{id}` failed: {error}")]
    Protocol { id: RequestId, error: RpcError },

    /// No matching response within the configured window
    #[error(
        "Timed out waiting for response with request id `{id}` after {} second(s)",
        .timeout.as_secs_f64()
    )]
    Timeout { id: RequestId, timeout: Duration },

    /// The outbound request could not be encoded
    #[error("failed to encode request: {0}")]
    Encode(#[source] CodecError),

    /// The provider was disconnected
    #[error("provider is disconnected")]
    Closed,
}

impl ProviderError {
    /// Request id the error refers to, if any
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            ProviderError::Protocol { id, .. } | ProviderError::Timeout { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rpc_error_deserialization() {
        let error: RpcError =
            serde_json::from_value(json!({"code": -32601, "message": "Method not found"}))
                .unwrap();
        assert!(error.is_method_not_found());
        assert!(error.data.is_none());
    }

    #[test]
    fn test_rpc_error_serialization_skips_missing_data() {
        let error = RpcError::new(codes::INVALID_PARAMS, "missing 'to' field");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("-32602"));
        assert!(!json.contains("data"));
    }

    #[test]
    fn test_rpc_error_from_malformed_value() {
        let error = RpcError::from_value(&json!("execution reverted"));
        assert_eq!(error.code, codes::INTERNAL_ERROR);
        assert_eq!(error.data, Some(json!("execution reverted")));
    }

    #[test]
    fn test_timeout_message() {
        let err = ProviderError::Timeout {
            id: RequestId::new(0),
            timeout: Duration::from_millis(1),
        };
        assert_eq!(
            err.to_string(),
            "Timed out waiting for response with request id `0` after 0.001 second(s)"
        );
        assert!(err.is_timeout());
        assert_eq!(err.request_id(), Some(RequestId::new(0)));
    }

    #[test]
    fn test_timeout_message_whole_seconds() {
        let err = ProviderError::Timeout {
            id: RequestId::new(3),
            timeout: Duration::from_secs(50),
        };
        assert!(err.to_string().ends_with("after 50 second(s)"));
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: ProviderError = TransportError::Closed.into();
        assert!(matches!(err, ProviderError::Transport(TransportError::Closed)));
        assert_eq!(err.request_id(), None);
    }
}
