//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → tls.rs (optional TLS handshake, client certificate → identity)
//!     → connection.rs (lifecycle tracking for draining)
//!     → Hand off to RPC or HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked so graceful stop can drain
//! - TLS is optional; client certificates are verified if given, never required

pub mod connection;
pub mod listener;
pub mod tls;
