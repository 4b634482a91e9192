//! Echo gateway library.
//!
//! One echo service exposed over two transports at once, a framed binary
//! RPC protocol and JSON/HTTP, with a shared layered authenticator in front
//! of both.

pub mod auth;
pub mod config;
pub mod echo;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod rpc;
pub mod service;

pub use config::schema::GatewayConfig;
pub use error::{Error, StartupError, TransportError};
pub use lifecycle::{Orchestrator, RunError, Shutdown};
pub use service::Service;
