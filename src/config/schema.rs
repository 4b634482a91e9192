//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the echo gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Binary RPC listener.
    pub rpc: RpcConfig,

    /// JSON/HTTP listener.
    pub http: HttpConfig,

    /// TLS material shared by both listeners. Plaintext when absent.
    pub tls: Option<TlsConfig>,

    /// Credentials accepted by the authenticator.
    pub auth: AuthConfig,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// RPC listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Largest frame payload accepted from a client.
    pub max_frame_bytes: usize,

    /// Seconds a client gets to finish the TLS handshake before the
    /// connection (and its permit) is dropped.
    pub handshake_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            max_connections: 10_000,
            max_frame_bytes: 4 * 1024 * 1024,
            handshake_timeout_secs: 10,
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// TLS configuration for both listeners.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// CA bundle used to verify client certificates (PEM). Client
    /// certificates are requested, but not required, when set.
    #[serde(default)]
    pub client_ca_path: Option<String>,
}

/// Where authentication is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthPlacement {
    /// Transport middleware / interceptor in front of the service.
    #[default]
    Middleware,
    /// Decorator wrapped around the echo service itself.
    Decorator,
    /// No authentication. Must be chosen explicitly.
    Anonymous,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Comma-separated `name:secret` bearer tokens.
    pub tokens: String,

    /// Comma-separated domains allowed to authenticate by client certificate.
    pub allowed_domains: String,

    /// Middleware, decorator or anonymous.
    pub placement: AuthPlacement,
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long listeners may drain in-flight requests after a stop.
    pub grace_period_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 1_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub log_filter: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Prometheus scrape address. Metrics are not exported when absent.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "echo_gateway=info,tower_http=info".to_string(),
            log_format: LogFormat::Full,
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_original_ports() {
        let config = GatewayConfig::default();
        assert_eq!(config.rpc.bind_address, "0.0.0.0:8000");
        assert_eq!(config.http.bind_address, "0.0.0.0:8080");
        assert_eq!(config.auth.placement, AuthPlacement::Middleware);
        assert!(config.tls.is_none());
    }

    #[test]
    fn parses_partial_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [auth]
            tokens = "alice:wibble"
            placement = "decorator"

            [tls]
            cert_path = "pki/server.crt"
            key_path = "pki/server.key"
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.tokens, "alice:wibble");
        assert_eq!(config.auth.placement, AuthPlacement::Decorator);
        assert!(config.tls.unwrap().client_ca_path.is_none());
        assert_eq!(config.shutdown.grace_period_ms, 1_000);
        assert_eq!(config.rpc.handshake_timeout_secs, 10);
    }
}
