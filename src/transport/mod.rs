// src/transport/mod.rs

//! Transport boundary to the TeamForge service endpoints
//!
//! The client never speaks a wire protocol directly. Every remote operation
//! goes through a [`Transport`], which takes an endpoint URL, an operation
//! name and positional JSON arguments, and returns a JSON value or a
//! [`TransportError`].
//!
//! Implementations must keep connectivity failures (connect, timeout)
//! distinguishable from application-level rejections (faults), because the
//! resolution layer relies on that distinction.

mod http;

pub use http::HttpTransport;

use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Fault code the server returns for an expired or logged-off session
pub const FAULT_INVALID_SESSION: &str = "InvalidSessionFault";

/// Fault code the server returns when a requested object does not exist
pub const FAULT_NO_SUCH_OBJECT: &str = "NoSuchObjectFault";

/// Fault code the server returns when credentials are rejected
pub const FAULT_LOGIN: &str = "LoginFault";

/// Errors raised by a transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint could not be reached
    #[error("connection to {endpoint} failed: {message}")]
    Connect { endpoint: String, message: String },

    /// The endpoint did not answer in time
    #[error("request to {endpoint} timed out: {message}")]
    Timeout { endpoint: String, message: String },

    /// The server rejected the operation
    #[error("{code}: {message}")]
    Fault { code: String, message: String },

    /// The server answered with something that is not a valid reply
    #[error("malformed response from {endpoint}: {message}")]
    Protocol { endpoint: String, message: String },
}

impl TransportError {
    /// Build a fault error
    pub fn fault(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Connection or timeout failure (as opposed to a server-side rejection)
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Timeout { .. })
    }

    /// Server reported the session as invalid
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, Self::Fault { code, .. } if code == FAULT_INVALID_SESSION)
    }

    /// Server reported the object as absent
    pub fn is_no_such_object(&self) -> bool {
        matches!(self, Self::Fault { code, .. } if code == FAULT_NO_SUCH_OBJECT)
    }
}

/// Synchronous request/response channel to a service endpoint
pub trait Transport: Send + Sync {
    /// Invoke `operation` on `endpoint` with positional arguments
    fn call(&self, endpoint: &Url, operation: &str, args: &[Value]) -> Result<Value, TransportError>;

    /// Check that an endpoint can be described before a proxy is bound to it
    ///
    /// The default accepts every endpoint.
    fn describe(&self, endpoint: &Url) -> Result<(), TransportError> {
        let _ = endpoint;
        Ok(())
    }

    /// Human-readable name for logging
    fn name(&self) -> &str;
}
