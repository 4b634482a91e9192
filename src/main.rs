//! Echo gateway (v1)
//!
//! Serves one echo service over a binary RPC transport and a JSON/HTTP
//! transport at the same time.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     ECHO GATEWAY                      │
//!                 │                                                       │
//!   RPC client    │  ┌──────────┐   ┌────────────┐   ┌──────────────┐    │
//!   ──────────────┼─▶│ listener │──▶│ rpc codec  │──▶│ interceptor  │─┐  │
//!                 │  │ (+TLS)   │   │ + dispatch │   └──────────────┘ │  │
//!                 │  └──────────┘   └────────────┘                    ▼  │
//!                 │                                          ┌──────────┐│
//!                 │                                          │  echo    ││
//!                 │                                          │ service  ││
//!                 │                                          └──────────┘│
//!   HTTP client   │  ┌──────────┐   ┌────────────┐   ┌──────────────┐ ▲  │
//!   ──────────────┼─▶│ acceptor │──▶│ axum       │──▶│ auth         │─┘  │
//!                 │  │ (+TLS)   │   │ router     │   │ middleware   │    │
//!                 │  └──────────┘   └────────────┘   └──────────────┘    │
//!                 │                                                       │
//!                 │  lifecycle: orchestrator, single-fire shutdown,       │
//!                 │  signals; observability: tracing + prometheus         │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use echo_gateway::config::{self, AuthPlacement, ConfigError, GatewayConfig, TlsConfig};
use echo_gateway::lifecycle::startup;
use echo_gateway::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "echo-gateway", version)]
#[command(about = "Echo service over binary RPC and JSON/HTTP", long_about = None)]
struct Args {
    /// TOML configuration file. Flags override values from it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RPC listen address
    #[arg(long)]
    rpc_address: Option<String>,

    /// HTTP listen address
    #[arg(long)]
    http_address: Option<String>,

    /// Server certificate chain (PEM)
    #[arg(long, requires = "tls_key")]
    tls_cert: Option<String>,

    /// Server private key (PEM)
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<String>,

    /// CA bundle for verifying client certificates (PEM)
    #[arg(long)]
    client_ca: Option<String>,

    /// Comma-separated name:token pairs
    #[arg(long)]
    tokens: Option<String>,

    /// Comma-separated domains allowed to authenticate by certificate
    #[arg(long)]
    allowed_domains: Option<String>,

    /// Where authentication runs
    #[arg(long, value_enum)]
    auth: Option<AuthPlacement>,

    /// Prometheus scrape address
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::read_config(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(address) = self.rpc_address {
            config.rpc.bind_address = address;
        }
        if let Some(address) = self.http_address {
            config.http.bind_address = address;
        }
        if let (Some(cert_path), Some(key_path)) = (self.tls_cert, self.tls_key) {
            let client_ca_path = config.tls.take().and_then(|tls| tls.client_ca_path);
            config.tls = Some(TlsConfig {
                cert_path,
                key_path,
                client_ca_path,
            });
        }
        if let Some(client_ca) = self.client_ca {
            match config.tls.as_mut() {
                Some(tls) => tls.client_ca_path = Some(client_ca),
                None => {
                    return Err(ConfigError::Validation(vec![config::ValidationError {
                        field: "tls.client_ca_path",
                        message: "--client-ca needs a server certificate and key".into(),
                    }]))
                }
            }
        }
        if let Some(tokens) = self.tokens {
            config.auth.tokens = tokens;
        }
        if let Some(domains) = self.allowed_domains {
            config.auth.allowed_domains = domains;
        }
        if let Some(placement) = self.auth {
            config.auth.placement = placement;
        }
        if let Some(address) = self.metrics_address {
            config.observability.metrics_address = Some(address);
        }

        config::validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("echo-gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("echo-gateway: cannot initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!("echo-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    match startup::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Exiting with failure");
            ExitCode::FAILURE
        }
    }
}
