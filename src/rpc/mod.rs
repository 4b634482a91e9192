//! Binary RPC transport.
//!
//! # Data Flow
//! ```text
//! TCP (+ TLS, + optional client certificate)
//!     → codec.rs (12-byte header, JSON payload)
//!     → server.rs (RpcRequest → method dispatch)
//!         → interceptor.rs (middleware placement: authenticate first)
//!         → EchoService
//!     → codec.rs (RpcResponse frame)
//! ```

pub mod client;
pub mod codec;
pub mod interceptor;
pub mod message;
pub mod server;

pub use client::{ClientError, RpcClient};
pub use message::{RpcCode, RpcRequest, RpcResponse, RpcStatus, AUTHORIZATION_KEY};
pub use server::RpcService;
