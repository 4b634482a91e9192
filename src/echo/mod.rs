//! The echo service: the business logic both transports expose.
//!
//! # Data Flow
//! ```text
//! RPC frame / HTTP JSON body
//!     → EchoRequest + RequestContext
//!     → [decorator.rs: authenticate, attach principal] (decorator placement)
//!     → server.rs (echo the message back)
//!     → EchoResponse / ServiceError
//! ```

pub mod decorator;
pub mod server;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{ErrorId, RequestContext};

pub use decorator::AuthDecorator;
pub use server::EchoServer;

/// Fully-qualified RPC method name for [`EchoService::echo`].
pub const ECHO_METHOD: &str = "example.Example/Echo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Failures a service call can report back to its transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("permission denied: {error_id}")]
    PermissionDenied { error_id: ErrorId },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Transport-agnostic echo contract.
pub trait EchoService: Send + Sync {
    fn echo(&self, ctx: &mut RequestContext, request: EchoRequest)
        -> Result<EchoResponse, ServiceError>;
}

impl<S: EchoService + ?Sized> EchoService for std::sync::Arc<S> {
    fn echo(
        &self,
        ctx: &mut RequestContext,
        request: EchoRequest,
    ) -> Result<EchoResponse, ServiceError> {
        (**self).echo(ctx, request)
    }
}
