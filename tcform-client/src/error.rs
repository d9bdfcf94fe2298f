//! Error types for tcform-client.

use thiserror::Error;

/// All errors a [`RemoteClient`](crate::RemoteClient) call can surface.
///
/// Apart from [`ClientError::NotFound`], every variant is an opaque call
/// failure to callers: no retry or transient/permanent classification happens
/// at this layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The entity (or the entity a sub-resource hangs off) does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// The server answered with a non-success status.
    #[error("{operation} failed with HTTP {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },

    /// The response body was not the JSON shape expected.
    #[error("{operation}: cannot decode response: {source}")]
    Decode {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// A failure with no transport detail (lock poisoning, injected faults).
    #[error("{0}")]
    CallFailed(String),
}

impl ClientError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ClientError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}
