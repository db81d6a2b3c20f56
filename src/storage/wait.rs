//! Storage decorator that lets tests wait for paths to be written.
//!
//! Pull-through mirroring writes blobs and links in the background after the
//! client response has been sent. [`WaitDriver::wait_for`] blocks until every
//! requested path exists, registering a one-shot signal per missing path that
//! the next `put_content` on that path fires.

use std::collections::HashMap;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{FileInfo, StorageDriver, StorageError, StorageResult};
use crate::{Error, Result};

enum Wake {
    Written,
    Cancelled,
}

/// Wraps a [`StorageDriver`] and signals waiters when paths get written.
#[derive(Debug)]
pub struct WaitDriver<D> {
    inner: D,
    /// Pending demands; each sender fires `true` exactly once.
    demands: Mutex<Demands>,
}

type Demands = HashMap<String, watch::Sender<bool>>;

impl<D: StorageDriver> WaitDriver<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            demands: Mutex::new(HashMap::new()),
        }
    }

    /// Paths some waiter is currently blocked on, sorted.
    ///
    /// Demands left behind by waiters that went away are pruned first.
    pub async fn pending_paths(&self) -> Vec<String> {
        let mut demands = self.demands.lock().await;
        demands.retain(|_, signal| signal.receiver_count() > 0);
        let mut paths: Vec<String> = demands.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Block until every path in `paths` exists.
    ///
    /// Existence checks and signal registration happen under one lock, so a
    /// write racing with the check is never missed. Paths are then awaited
    /// in order. Fails with [`Error::Cancelled`] naming the path being
    /// awaited when `cancel` fires, and with [`Error::Stat`] when the
    /// underlying driver fails for a reason other than a missing path.
    ///
    /// Dropping the returned future releases its registrations the same way
    /// cancellation does.
    pub async fn wait_for<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        paths: &[S],
    ) -> Result<()> {
        let mut registration = Registration::new(&self.demands);
        {
            let mut demands = self.demands.lock().await;
            for path in paths {
                let path = path.as_ref();
                match self.inner.stat(path).await {
                    Ok(_) => continue,
                    Err(StorageError::PathNotFound(_)) => {}
                    Err(source) => {
                        let registered = registration.disarm();
                        release(&mut demands, &registered);
                        return Err(Error::Stat {
                            path: path.to_string(),
                            source,
                        });
                    }
                }

                let rx = match demands.get(path) {
                    Some(signal) => signal.subscribe(),
                    None => {
                        let (signal, rx) = watch::channel(false);
                        demands.insert(path.to_string(), signal);
                        rx
                    }
                };
                debug!(path, "waiting for write");
                registration.pending.push((path.to_string(), rx));
            }
        }

        while let Some((path, rx)) = registration.pending.first_mut() {
            let wake = tokio::select! {
                res = rx.wait_for(|written| *written) => match res {
                    Ok(_) => Wake::Written,
                    // Signal dropped without firing: the driver went away.
                    Err(_) => Wake::Cancelled,
                },
                _ = cancel.cancelled() => Wake::Cancelled,
            };

            if let Wake::Cancelled = wake {
                let path = path.clone();
                registration.release().await;
                debug!(%path, "wait cancelled");
                return Err(Error::Cancelled { path });
            }
            debug!(%path, "observed write");
            registration.pending.remove(0);
        }
        Ok(())
    }
}

/// Receivers held by one `wait_for` call. Whatever is still pending when
/// the registration goes away is released.
struct Registration<'a> {
    demands: &'a Mutex<Demands>,
    pending: Vec<(String, watch::Receiver<bool>)>,
}

impl<'a> Registration<'a> {
    fn new(demands: &'a Mutex<Demands>) -> Self {
        Self {
            demands,
            pending: Vec::new(),
        }
    }

    /// Drop the held receivers and return their paths.
    fn disarm(&mut self) -> Vec<String> {
        self.pending.drain(..).map(|(path, _)| path).collect()
    }

    async fn release(mut self) {
        let paths = self.disarm();
        release(&mut *self.demands.lock().await, &paths);
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let paths = self.disarm();
        // A contended lock leaves the demands for `pending_paths` to prune.
        if let Ok(mut demands) = self.demands.try_lock() {
            release(&mut demands, &paths);
        }
    }
}

/// Drop demands nobody waits on any more. Callers must have dropped their
/// receivers first.
fn release(demands: &mut Demands, paths: &[String]) {
    for path in paths {
        if demands
            .get(path)
            .is_some_and(|signal| signal.receiver_count() == 0)
        {
            demands.remove(path);
        }
    }
}

#[async_trait::async_trait]
impl<D: StorageDriver> StorageDriver for WaitDriver<D> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_content(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.inner.get_content(path).await
    }

    /// Write through, then wake everyone waiting on `path`.
    async fn put_content(&self, path: &str, content: &[u8]) -> StorageResult<()> {
        self.inner.put_content(path, content).await?;
        if let Some(signal) = self.demands.lock().await.remove(path) {
            signal.send_replace(true);
            debug!(path, waiters = signal.receiver_count(), "signalled write");
        }
        Ok(())
    }

    async fn stat(&self, path: &str) -> StorageResult<FileInfo> {
        self.inner.stat(path).await
    }

    async fn list(&self, path: &str) -> StorageResult<Vec<String>> {
        self.inner.list(path).await
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.inner.delete(path).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::storage::InMemoryDriver;

    #[tokio::test]
    async fn existing_paths_return_immediately() {
        let d = WaitDriver::new(InMemoryDriver::new());
        d.put_content("/a", b"1").await.unwrap();
        d.wait_for(&CancellationToken::new(), &["/a"]).await.unwrap();
        assert!(d.pending_paths().await.is_empty());
    }

    #[tokio::test]
    async fn two_waiters_share_one_signal() {
        let d = Arc::new(WaitDriver::new(InMemoryDriver::new()));
        let token = CancellationToken::new();

        let mut tasks = Vec::new();
        for _ in 0..2 {
            let d = d.clone();
            let token = token.clone();
            tasks.push(tokio::spawn(async move { d.wait_for(&token, &["/x"]).await }));
        }

        while d.pending_paths().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        d.put_content("/x", b"").await.unwrap();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert!(d.pending_paths().await.is_empty());
    }

    #[tokio::test]
    async fn stat_failure_is_reported() {
        let d = WaitDriver::new(InMemoryDriver::new());
        let err = d
            .wait_for(&CancellationToken::new(), &["relative"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Stat { ref path, .. } if path == "relative"), "{err}");
    }

    #[tokio::test]
    async fn dropped_wait_releases_its_demand() {
        let d = WaitDriver::new(InMemoryDriver::new());
        let token = CancellationToken::new();

        let res = tokio::time::timeout(Duration::from_millis(20), d.wait_for(&token, &["/p"])).await;
        assert!(res.is_err(), "nothing wrote /p");
        assert!(d.demands.lock().await.is_empty());
        assert!(d.pending_paths().await.is_empty());
    }
}
