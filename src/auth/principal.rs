//! Authenticated principals and their propagation through request context.

use axum::http::Extensions;
use std::fmt;

use crate::auth::{CertificateIdentity, Credentials};

/// The username produced by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which transport a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Rpc,
    Http,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Rpc => "rpc",
            Transport::Http => "http",
        }
    }
}

/// Per-request context handed to the echo service.
///
/// The principal slot is write-once: the first layer to authenticate the
/// request owns it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    transport: Transport,
    credentials: Credentials,
    principal: Option<Principal>,
}

impl RequestContext {
    pub fn new(transport: Transport, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            principal: None,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn peer(&self) -> Option<&CertificateIdentity> {
        self.credentials.peer.as_ref()
    }

    /// Attach `principal` unless one is already present. Returns whether the
    /// attachment took place.
    pub fn attach_principal(&mut self, principal: Principal) -> bool {
        if self.principal.is_some() {
            return false;
        }
        self.principal = Some(principal);
        true
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Username of the attached principal, or an empty string for anonymous
    /// requests.
    pub fn username(&self) -> &str {
        self.principal.as_ref().map(Principal::name).unwrap_or_default()
    }
}

/// Write-once attachment for HTTP request extensions.
pub fn attach_principal(extensions: &mut Extensions, principal: Principal) -> bool {
    if extensions.get::<Principal>().is_some() {
        return false;
    }
    extensions.insert(principal);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_principal_wins() {
        let mut ctx = RequestContext::new(Transport::Rpc, Credentials::default());
        assert_eq!(ctx.username(), "");
        assert!(ctx.attach_principal(Principal::new("server.example.com")));
        assert!(!ctx.attach_principal(Principal::new("alice")));
        assert_eq!(ctx.username(), "server.example.com");
    }

    #[test]
    fn extensions_are_never_overwritten() {
        let mut extensions = Extensions::new();
        assert!(attach_principal(&mut extensions, Principal::new("alice")));
        assert!(!attach_principal(&mut extensions, Principal::new("bob")));
        assert_eq!(extensions.get::<Principal>().unwrap().name(), "alice");
    }
}
