/// Errors produced while handling manifests, digests and layers.
#[derive(Debug, thiserror::Error)]
pub enum OciError {
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("layer error: {0}")]
    Layer(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OciError>;
