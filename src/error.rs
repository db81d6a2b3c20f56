//! Error types for regharness

use thiserror::Error;

use crate::storage::StorageError;

/// Result type alias using regharness Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in regharness operations
#[derive(Error, Debug)]
pub enum Error {
    /// A resource with the same key is already stored
    #[error("{resource} {name:?} already exists")]
    AlreadyExists { resource: &'static str, name: String },

    /// The addressed resource is not stored
    #[error("{resource} {name:?} not found")]
    NotFound { resource: &'static str, name: String },

    /// Malformed request (composite names, unparseable manifests)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The dispatcher has no route for the action
    #[error("{verb} on {resource} (subresource {subresource:?}) is not implemented")]
    NotImplemented {
        verb: String,
        resource: String,
        subresource: String,
    },

    /// The outgoing request URL already appears in the request trace
    #[error("request to {url:?} is denied because a loop is detected")]
    LoopDetected { url: String },

    /// `wait_for` was cancelled while a path was still pending
    #[error("cancelled while waiting for {path:?}")]
    Cancelled { path: String },

    /// Underlying driver failed to stat a path in `wait_for`
    #[error("stat {path:?}: {source}")]
    Stat {
        path: String,
        #[source]
        source: StorageError,
    },

    /// Storage driver errors outside of `wait_for`
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Manifest, digest or layer errors
    #[error("OCI error: {0}")]
    Oci(#[from] regharness_oci::OciError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// TLS setup errors
    #[error("TLS error: {0}")]
    Tls(String),

    /// Timeout waiting for operation
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn already_exists(resource: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource,
            name: name.into(),
        }
    }

    pub fn not_found(resource: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
