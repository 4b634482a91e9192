//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values and combinations. Every
//! problem is reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{AuthPlacement, GatewayConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "rpc.bind_address", &config.rpc.bind_address);
    check_address(&mut errors, "http.bind_address", &config.http.bind_address);

    if config.rpc.max_connections == 0 {
        errors.push(ValidationError::new("rpc.max_connections", "must be greater than 0"));
    }
    if config.rpc.max_frame_bytes == 0 || config.rpc.max_frame_bytes > u32::MAX as usize {
        errors.push(ValidationError::new(
            "rpc.max_frame_bytes",
            "must be between 1 and 4294967295",
        ));
    }
    if config.rpc.handshake_timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.handshake_timeout_secs", "must be greater than 0"));
    }
    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::new("http.request_timeout_secs", "must be greater than 0"));
    }

    let has_domains = config.auth.allowed_domains.split(',').any(|d| !d.trim().is_empty());
    let has_tokens = config.auth.tokens.split(',').any(|t| !t.trim().is_empty());
    let client_ca = config.tls.as_ref().and_then(|tls| tls.client_ca_path.as_ref());

    if has_domains && client_ca.is_none() {
        errors.push(ValidationError::new(
            "auth.allowed_domains",
            "requires tls.client_ca_path so client certificates can be verified",
        ));
    }
    if config.auth.placement != AuthPlacement::Anonymous && !has_tokens && !has_domains {
        errors.push(ValidationError::new(
            "auth",
            "no tokens or allowed domains configured; \
             set placement = \"anonymous\" to accept unauthenticated requests",
        ));
    }

    if let Some(addr) = &config.observability.metrics_address {
        check_address(&mut errors, "observability.metrics_address", addr);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address '{value}'")));
    }
}
