//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → passed by reference to constructors
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there are no global flags
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    AuthConfig, AuthPlacement, GatewayConfig, HttpConfig, LogFormat, ObservabilityConfig,
    RpcConfig, ShutdownConfig, TlsConfig,
};
pub use validation::{validate_config, ValidationError};
