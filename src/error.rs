// src/error.rs

//! Error types for TeamForge client operations
//!
//! Every variant that originates from a remote call keeps the transport's
//! diagnostic text so operator-facing logs show what the server said.
//! "Not found" is never an error here: resolvers return `Ok(None)`.

use thiserror::Error;

/// Errors produced by the client library
#[derive(Error, Debug)]
pub enum Error {
    /// Login was rejected or could not be performed
    #[error("Authentication failed for {username}: {message}")]
    Authentication { username: String, message: String },

    /// An operation was attempted with a missing or invalidated session
    #[error("Session is not valid: {0}")]
    SessionInvalid(String),

    /// A service endpoint could not be constructed or described
    #[error("Service {subsystem} unavailable: {message}")]
    ServiceUnavailable { subsystem: String, message: String },

    /// A listing or query call failed at the transport level
    #[error("Lookup {operation} failed: {message}")]
    RemoteLookup { operation: String, message: String },

    /// A mutating call failed at the transport level
    #[error("Remote call {operation} failed: {message}")]
    RemoteCall { operation: String, message: String },

    /// Parallel argument lists have different lengths
    #[error("Argument mismatch: {titles} titles but {descriptions} descriptions")]
    ArgumentMismatch { titles: usize, descriptions: usize },

    /// A role title did not resolve within its project
    #[error("Role '{role}' not found in project {project_id}")]
    RoleNotFound { role: String, project_id: String },

    /// The chunked upload pipeline failed or was misused
    #[error("Upload failed after {bytes_written} bytes (upload id: {}): {message}", .upload_id.as_deref().unwrap_or("none"))]
    UploadFailed {
        upload_id: Option<String>,
        bytes_written: u64,
        message: String,
    },

    /// A named target of a publish or grant does not exist
    #[error("{kind} '{title}' not found")]
    TargetNotFound { kind: String, title: String },

    /// A project's document root folder could not be determined
    #[error("Document root folder: {0}")]
    RootFolder(String),

    /// Configuration could not be loaded or is incomplete
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Local I/O failure
    #[error("I/O error: {0}")]
    IoError(String),

    /// A value could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl Error {
    /// Whether the caller must log in again before retrying
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::SessionInvalid(_) | Error::Authentication { .. })
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;
