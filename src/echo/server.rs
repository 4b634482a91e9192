//! Plain echo implementation.

use chrono::Utc;

use crate::auth::RequestContext;
use crate::echo::{EchoRequest, EchoResponse, EchoService, ServiceError};

/// Echoes the request message back with a timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoServer;

impl EchoServer {
    pub fn new() -> Self {
        Self
    }
}

impl EchoService for EchoServer {
    fn echo(
        &self,
        ctx: &mut RequestContext,
        request: EchoRequest,
    ) -> Result<EchoResponse, ServiceError> {
        tracing::info!(
            transport = ctx.transport().as_str(),
            user = ctx.username(),
            message = %request.message,
            "Echo request"
        );
        Ok(EchoResponse {
            message: request.message,
            created_at: Utc::now(),
        })
    }
}
