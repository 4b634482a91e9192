//! The contract every transport listener implements.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::TransportError;

/// A startable and stoppable listener.
pub trait Service: Send + Sync {
    /// Short name used for logging and as the orchestrator action name.
    fn name(&self) -> &'static str;

    /// Bind and serve until stopped or fatally failed. Returns `Ok` after a
    /// graceful stop.
    fn listen_and_serve(self: Arc<Self>) -> BoxFuture<'static, Result<(), TransportError>>;

    /// Stop accepting new work and drain in-flight work within the grace
    /// period. Safe to call more than once, and before the service started.
    fn graceful_stop(&self);
}
