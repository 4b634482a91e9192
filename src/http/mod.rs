//! JSON/HTTP transport.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → acceptor.rs (TLS handshake, PeerIdentity extension)
//!     → server.rs (Axum router: request ID, trace, timeout)
//!     → middleware.rs (middleware placement: authenticate, attach Principal)
//!     → echo handler (RequestContext → EchoService)
//!     → response.rs (JSON body, or 403 / 400)
//! ```

pub mod acceptor;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use server::{build_router, HttpService, ECHO_PATH};
