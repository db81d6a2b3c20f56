//! Port discovery and readiness probes.

use std::net::TcpListener;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::{Error, Result};

/// A port on `host` that was free at the time of the call.
///
/// The port is released before returning, so another process may grab it
/// first.
pub fn find_free_local_port(host: &str) -> Result<u16> {
    let listener = TcpListener::bind((host, 0))?;
    let port = listener.local_addr()?.port();
    debug!(host, port, "found free port");
    Ok(port)
}

/// Wait until `addr` (`host:port`) accepts TCP connections.
pub async fn wait_tcp(addr: &str, config: &HarnessConfig) -> Result<()> {
    let deadline = Instant::now() + config.ready_timeout;
    loop {
        let last_error = match timeout_at(deadline, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => {
                info!(addr, "tcp endpoint ready");
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => "connect timed out".to_string(),
        };

        if Instant::now() + config.poll_interval >= deadline {
            return Err(Error::Timeout(format!(
                "{addr} not accepting connections after {}: {last_error}",
                humantime::format_duration(config.ready_timeout)
            )));
        }
        debug!(addr, error = %last_error, "tcp endpoint not ready");
        sleep(config.poll_interval).await;
    }
}

/// Wait until `url` answers with a status below 500, using a plain client.
pub async fn wait_http(url: &str, config: &HarnessConfig) -> Result<reqwest::StatusCode> {
    let client = reqwest::Client::builder().build()?;
    wait_http_with(&client, url, config).await
}

/// Like [`wait_http`], probing with `client` (e.g. one trusting a test CA).
pub async fn wait_http_with(
    client: &reqwest::Client,
    url: &str,
    config: &HarnessConfig,
) -> Result<reqwest::StatusCode> {
    let deadline = Instant::now() + config.ready_timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let last_error = match client.get(url).timeout(remaining).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!(url, status = %resp.status(), "http endpoint ready");
                return Ok(resp.status());
            }
            Ok(resp) => format!("status {}", resp.status()),
            Err(e) => e.to_string(),
        };

        if Instant::now() + config.poll_interval >= deadline {
            return Err(Error::Timeout(format!(
                "{url} not ready after {}: {last_error}",
                humantime::format_duration(config.ready_timeout)
            )));
        }
        debug!(url, error = %last_error, "http endpoint not ready");
        sleep(config.poll_interval).await;
    }
}
