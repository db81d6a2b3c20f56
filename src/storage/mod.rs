//! Storage driver boundary of the registry and the decorators tests use.
//!
//! The registry under test reads and writes blobs, links and manifests
//! through a [`StorageDriver`]. [`InMemoryDriver`] is a process-local
//! implementation; [`WaitDriver`] wraps any driver so tests can block until
//! pull-through mirroring has written the paths they care about.

pub mod memory;
pub mod paths;
pub mod wait;

pub use memory::InMemoryDriver;
pub use wait::WaitDriver;

/// Errors reported by storage drivers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Nothing is stored at the path.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The path is not an absolute, normalised driver path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Any other driver failure.
    #[error("{driver}: {message}")]
    Driver { driver: String, message: String },
}

/// Result alias for storage driver operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// What `stat` knows about a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
}

/// Minimal storage driver interface of the registry.
///
/// Paths are absolute, `/`-separated, and never end in `/` (except the root).
#[async_trait::async_trait]
pub trait StorageDriver: Send + Sync {
    /// Human-readable driver name.
    fn name(&self) -> &str;

    async fn get_content(&self, path: &str) -> StorageResult<Vec<u8>>;

    async fn put_content(&self, path: &str, content: &[u8]) -> StorageResult<()>;

    /// Fails with [`StorageError::PathNotFound`] when nothing is stored at
    /// or below `path`.
    async fn stat(&self, path: &str) -> StorageResult<FileInfo>;

    /// Direct children of the directory `path`, as full paths.
    async fn list(&self, path: &str) -> StorageResult<Vec<String>>;

    /// Remove `path` and everything below it.
    async fn delete(&self, path: &str) -> StorageResult<()>;
}

/// Check that `path` is a valid driver path.
pub fn validate_path(path: &str) -> StorageResult<()> {
    let valid = path == "/"
        || (path.starts_with('/')
            && !path.ends_with('/')
            && !path.contains("//")
            && !path.split('/').any(|c| c == "." || c == ".."));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_validation() {
        assert!(validate_path("/").is_ok());
        assert!(validate_path("/docker/registry/v2").is_ok());
        assert!(validate_path("relative").is_err());
        assert!(validate_path("/trailing/").is_err());
        assert!(validate_path("/double//slash").is_err());
        assert!(validate_path("/a/../b").is_err());
    }
}
