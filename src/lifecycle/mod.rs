//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! startup.rs builds one action per transport
//!     → orchestrator.rs (spawn all + implicit signal wait)
//!     → first action to finish fires shutdown.rs (single-fire gate)
//!         → shutdown callback: graceful_stop() on every transport
//!         → shared ShutdownListener wakes context-aware actions
//!     → wait for all actions, aggregate failures
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → signal-wait action ends → orchestrated shutdown
//! ```
//!
//! # Design Decisions
//! - Shutdown fires at most once, whichever action ends first
//! - Panics are isolated per action and reported as failures
//! - No retries; a finished action is never restarted
//! - Every failure is reported, ordered by registration

pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use orchestrator::{run, Action, Orchestrator, RunError, TaskFailure};
pub use shutdown::{Shutdown, ShutdownListener};

/// Error type carried by actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
