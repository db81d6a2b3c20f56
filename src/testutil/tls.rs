//! In-memory HTTPS termination in front of a plain HTTP backend.
//!
//! The registry under test refuses to mirror from insecure upstreams unless
//! told otherwise. [`TlsTerminator`] puts a throwaway TLS endpoint in front of
//! a plain test server so pull-through can be exercised over HTTPS without
//! certificates on disk.

use std::net::SocketAddr;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;
use tokio::io::copy_bidirectional;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::{Error, Result};

/// A running TLS endpoint forwarding decrypted traffic to `backend`.
#[derive(Debug)]
pub struct TlsTerminator {
    addr: SocketAddr,
    host: String,
    certificate_pem: String,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TlsTerminator {
    /// Generate a self-signed certificate for `localhost` and the listen
    /// host, and start accepting on a free port of the listen host.
    pub async fn start(backend: SocketAddr, config: &HarnessConfig) -> Result<Self> {
        let host = config.listen_host.clone();
        let mut names = vec!["localhost".to_string()];
        if host != "localhost" {
            names.push(host.clone());
        }

        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(names).map_err(tls_error)?;
        let certificate_pem = cert.pem();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
        let acceptor = acceptor(vec![cert.der().clone()], key)?;

        let listener = TcpListener::bind((host.as_str(), 0)).await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(accept_loop(listener, acceptor, backend, shutdown.clone()));
        info!(%addr, %backend, "tls terminator started");

        Ok(Self {
            addr,
            host,
            certificate_pem,
            shutdown,
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `https://<listen host>:<port>`, matching the certificate.
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("https://[{}]:{}", self.host, self.addr.port())
        } else {
            format!("https://{}:{}", self.host, self.addr.port())
        }
    }

    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// An HTTP client trusting this terminator's certificate.
    pub fn client(&self) -> Result<reqwest::Client> {
        let cert = reqwest::Certificate::from_pem(self.certificate_pem.as_bytes())?;
        Ok(reqwest::Client::builder()
            .add_root_certificate(cert)
            .build()?)
    }

    /// Stop accepting and close open connections.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "tls accept loop failed");
            }
        }
        debug!(addr = %self.addr, "tls terminator stopped");
    }
}

impl Drop for TlsTerminator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn tls_error(e: impl std::fmt::Display) -> Error {
    Error::Tls(e.to_string())
}

fn acceptor(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Result<TlsAcceptor> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let server_config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(tls_error)?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(tls_error)?;
    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

async fn accept_loop(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    backend: SocketAddr,
    shutdown: CancellationToken,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
        };

        let acceptor = acceptor.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                res = splice(acceptor, stream, backend) => {
                    if let Err(e) = res {
                        debug!(%peer, error = %e, "tls connection ended with error");
                    }
                }
            }
        });
    }
}

async fn splice(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    backend: SocketAddr,
) -> std::io::Result<()> {
    let mut tls = acceptor.accept(stream).await?;
    let mut upstream = TcpStream::connect(backend).await?;
    let (sent, received) = copy_bidirectional(&mut tls, &mut upstream).await?;
    debug!(%backend, sent, received, "tls connection closed");
    Ok(())
}
