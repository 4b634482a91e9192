//! JSON payloads carried inside RPC frames.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata key carrying the scheme-qualified credential.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Status codes, named after their gRPC counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcCode {
    Ok,
    InvalidArgument,
    PermissionDenied,
    Unimplemented,
    Internal,
    Unavailable,
}

impl RpcCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcCode::Ok => "ok",
            RpcCode::InvalidArgument => "invalid_argument",
            RpcCode::PermissionDenied => "permission_denied",
            RpcCode::Unimplemented => "unimplemented",
            RpcCode::Internal => "internal",
            RpcCode::Unavailable => "unavailable",
        }
    }
}

/// Outcome of a call. Anything but `Ok` carries no body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcStatus {
    pub code: RpcCode,
    #[serde(default)]
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(RpcCode::Ok, "")
    }

    pub fn is_ok(&self) -> bool {
        self.code == RpcCode::Ok
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(self.code.as_str())
        } else {
            write!(f, "{}: {}", self.code.as_str(), self.message)
        }
    }
}

impl std::error::Error for RpcStatus {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Echoed in the response so clients can match them up.
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub body: serde_json::Value,
}

impl RpcRequest {
    /// Look up a metadata value. Keys compare ASCII case-insensitively,
    /// like HTTP header names.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    pub status: RpcStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl RpcResponse {
    pub fn ok(id: u64, body: serde_json::Value) -> Self {
        Self {
            id,
            status: RpcStatus::ok(),
            body: Some(body),
        }
    }

    pub fn error(id: u64, status: RpcStatus) -> Self {
        Self {
            id,
            status,
            body: None,
        }
    }
}
