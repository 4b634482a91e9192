//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Transport adapter (HTTP middleware / RPC interceptor / echo decorator)
//!     → credential.rs (collect peer identity + authorization value)
//!     → resolver.rs (certificate layer, then token layer)
//!         → allow_list.rs (CN / SAN membership)
//!         → token.rs (token → username map)
//!     → principal.rs (attach principal to request context)
//!
//! On failure:
//!     → error_id.rs (mint opaque id, log real cause next to it)
//!     → caller sees permission denied + id only
//! ```
//!
//! # Design Decisions
//! - Token map and allow-list are immutable after startup; no locking
//! - First layer to produce a principal wins, later layers never overwrite
//! - Callers never see failure causes, only the error id

pub mod allow_list;
pub mod credential;
pub mod error;
pub mod error_id;
pub mod identity;
pub mod principal;
pub mod resolver;
pub mod token;

pub use allow_list::{AllowList, DomainAllowList};
pub use credential::{Credential, Credentials, TokenCredential};
pub use error::{AuthDenied, AuthError};
pub use error_id::ErrorId;
pub use identity::{CertificateIdentity, PeerIdentity};
pub use principal::{attach_principal, Principal, RequestContext, Transport};
pub use resolver::Authenticator;
pub use token::{BearerAuth, TokenAuth};
