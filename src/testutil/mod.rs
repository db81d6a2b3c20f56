//! Helpers for tests driving a registry against the fake control plane.

pub mod counter;
pub mod fixtures;
pub mod log;
pub mod net;
pub mod tls;

pub use counter::Counter;
pub use log::{init_test_logging, LogCapture};
pub use net::{find_free_local_port, wait_http, wait_http_with, wait_tcp};
pub use tls::TlsTerminator;
