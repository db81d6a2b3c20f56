//! Process-local storage driver.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use super::{validate_path, FileInfo, StorageDriver, StorageError, StorageResult};

const DRIVER_NAME: &str = "inmemory";

/// Storage driver keeping file contents in a map keyed by path.
///
/// Directories are not stored; a directory exists while some file lives
/// below it.
#[derive(Debug, Default)]
pub struct InMemoryDriver {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All stored file paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files().keys().cloned().collect()
    }
}

fn dir_prefix(path: &str) -> String {
    if path == "/" {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

#[async_trait::async_trait]
impl StorageDriver for InMemoryDriver {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    async fn get_content(&self, path: &str) -> StorageResult<Vec<u8>> {
        validate_path(path)?;
        self.files()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::PathNotFound(path.to_string()))
    }

    async fn put_content(&self, path: &str, content: &[u8]) -> StorageResult<()> {
        validate_path(path)?;
        if path == "/" {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        trace!(path, size = content.len(), "put content");
        self.files().insert(path.to_string(), content.to_vec());
        Ok(())
    }

    async fn stat(&self, path: &str) -> StorageResult<FileInfo> {
        validate_path(path)?;
        let files = self.files();
        if let Some(content) = files.get(path) {
            return Ok(FileInfo {
                path: path.to_string(),
                size: content.len() as u64,
                is_dir: false,
            });
        }

        let prefix = dir_prefix(path);
        if files.keys().any(|k| k.starts_with(&prefix)) {
            return Ok(FileInfo {
                path: path.to_string(),
                size: 0,
                is_dir: true,
            });
        }
        Err(StorageError::PathNotFound(path.to_string()))
    }

    async fn list(&self, path: &str) -> StorageResult<Vec<String>> {
        validate_path(path)?;
        let prefix = dir_prefix(path);
        let mut children: Vec<String> = self
            .files()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(|child| format!("{prefix}{child}"))
            .collect();
        children.sort();
        children.dedup();

        if children.is_empty() && path != "/" {
            return Err(StorageError::PathNotFound(path.to_string()));
        }
        Ok(children)
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        validate_path(path)?;
        let prefix = dir_prefix(path);
        let mut files = self.files();
        let before = files.len();
        files.retain(|k, _| k != path && !k.starts_with(&prefix));
        if files.len() == before {
            return Err(StorageError::PathNotFound(path.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_stat() {
        let d = InMemoryDriver::new();
        d.put_content("/a/b/c", b"hello").await.unwrap();

        assert_eq!(d.get_content("/a/b/c").await.unwrap(), b"hello");
        let fi = d.stat("/a/b/c").await.unwrap();
        assert_eq!(fi.size, 5);
        assert!(!fi.is_dir);

        let dir = d.stat("/a/b").await.unwrap();
        assert!(dir.is_dir);
    }

    #[tokio::test]
    async fn missing_paths() {
        let d = InMemoryDriver::new();
        assert_eq!(
            d.stat("/nope").await.unwrap_err(),
            StorageError::PathNotFound("/nope".to_string())
        );
        assert!(matches!(
            d.get_content("/nope").await,
            Err(StorageError::PathNotFound(_))
        ));
        d.put_content("/ab", b"x").await.unwrap();
        assert!(
            d.stat("/a").await.is_err(),
            "sibling with a common prefix is not a child"
        );
    }

    #[tokio::test]
    async fn list_direct_children() {
        let d = InMemoryDriver::new();
        d.put_content("/r/x/1", b"").await.unwrap();
        d.put_content("/r/x/2", b"").await.unwrap();
        d.put_content("/r/y", b"").await.unwrap();

        assert_eq!(d.list("/r").await.unwrap(), ["/r/x", "/r/y"]);
        assert_eq!(d.list("/").await.unwrap(), ["/r"]);
        assert!(d.list("/missing").await.is_err());
        assert!(d.list("/").await.is_ok());
    }

    #[tokio::test]
    async fn delete_subtree() {
        let d = InMemoryDriver::new();
        d.put_content("/r/x/1", b"").await.unwrap();
        d.put_content("/r/y", b"").await.unwrap();

        d.delete("/r/x").await.unwrap();
        assert_eq!(d.paths(), ["/r/y"]);
        assert!(d.delete("/r/x").await.is_err());
    }

    #[tokio::test]
    async fn rejects_bad_paths() {
        let d = InMemoryDriver::new();
        assert!(matches!(
            d.put_content("rel", b"").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(d.put_content("/", b"").await.is_err());
    }
}
