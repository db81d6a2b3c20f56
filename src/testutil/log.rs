//! Logging hooks for tests.
//!
//! [`init_test_logging`] routes `tracing` output through the test harness so
//! it is shown only for failing tests. [`LogCapture`] records formatted
//! events in memory for tests that assert on what was logged.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a global subscriber writing to the test output. Filtered by
/// `RUST_LOG`, `debug` when unset. Safe to call from every test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        // Another global subscriber may already be installed by the test binary.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// In-memory sink for formatted log lines.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn buf(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A subscriber writing every event, without ANSI colours, into this
    /// capture. Use with `tracing::subscriber::with_default` or
    /// `set_default`.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }

    pub fn clear(&self) {
        self.buf().clear();
    }
}

/// Writer handed out per event by [`LogCapture`].
#[derive(Debug)]
pub struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buf: self.buf.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_structured_fields() {
        let capture = LogCapture::new();
        tracing::subscriber::with_default(capture.subscriber(), || {
            tracing::warn!(url = "https://a.example/", "request loop detected");
            tracing::debug!("second");
        });

        let lines = capture.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("WARN"));
        assert!(lines[0].contains("request loop detected"));
        assert!(lines[0].contains("url=\"https://a.example/\""));

        capture.clear();
        assert!(capture.contents().is_empty());
    }

    #[test]
    fn init_is_idempotent() {
        init_test_logging();
        init_test_logging();
    }
}
