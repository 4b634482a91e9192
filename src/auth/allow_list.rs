//! Certificate allow-lists.

use std::collections::HashSet;

use crate::auth::{AuthError, CertificateIdentity, Principal};

/// Decides which client certificates may authenticate.
pub trait AllowList: Send + Sync {
    /// A disabled allow-list is never consulted.
    fn enabled(&self) -> bool;

    fn allow(&self, identity: &CertificateIdentity) -> Result<Principal, AuthError>;
}

/// Allow-list keyed on DNS names.
#[derive(Debug, Clone, Default)]
pub struct DomainAllowList {
    allowed: HashSet<String>,
}

impl DomainAllowList {
    /// Build from a comma-separated domain list. Blank entries are dropped,
    /// so `""` yields a disabled list.
    pub fn from_domains(domains: &str) -> Self {
        let allowed = domains
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();
        Self { allowed }
    }
}

impl AllowList for DomainAllowList {
    fn enabled(&self) -> bool {
        !self.allowed.is_empty()
    }

    fn allow(&self, identity: &CertificateIdentity) -> Result<Principal, AuthError> {
        // TODO: consult issuer revocation lists before accepting the leaf
        identity
            .names()
            .find(|name| self.allowed.contains(*name))
            .map(Principal::new)
            .ok_or_else(|| AuthError::NoCertificateMatch {
                common_name: identity.common_name.clone().unwrap_or_default(),
            })
    }
}
