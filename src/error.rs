//! Process-level error taxonomy.
//!
//! Per-request auth failures never show up here: they are recovered at the
//! request boundary (see [`crate::auth::AuthDenied`]).

use std::net::AddrParseError;

use crate::config::ConfigError;
use crate::lifecycle::RunError;
use crate::net::tls::TlsError;

/// A listener's serve loop ended abnormally.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Fatal problems found before any listener starts.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),
    #[error("invalid address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddrParseError,
    },
    #[error("metrics setup failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Everything that can make the process exit non-zero.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("startup failed: {0}")]
    Startup(#[from] StartupError),
    #[error("run failed: {0}")]
    Run(#[from] RunError),
}
