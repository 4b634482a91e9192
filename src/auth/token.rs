//! Token-based authentication.

use std::collections::HashMap;

use crate::auth::{AuthError, Principal};

/// Resolves request tokens to principals.
pub trait TokenAuth: Send + Sync {
    /// Authorization scheme this resolver accepts, compared
    /// case-insensitively against the request.
    fn scheme(&self) -> &str;

    fn authenticate(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Static bearer tokens, built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct BearerAuth {
    /// token -> username
    tokens: HashMap<String, String>,
}

impl BearerAuth {
    /// Build from a comma-separated list of `name:secret` pairs.
    ///
    /// Entries without a `:` are skipped with a warning so a typo cannot
    /// take the whole server down.
    pub fn from_pairs(pairs: &str) -> Self {
        let mut tokens = HashMap::new();
        for entry in pairs.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once(':') {
                Some((name, secret)) if !name.is_empty() && !secret.is_empty() => {
                    tokens.insert(secret.to_string(), name.to_string());
                }
                _ => tracing::warn!("Ignoring malformed token entry (expected name:secret)"),
            }
        }
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenAuth for BearerAuth {
    fn scheme(&self) -> &str {
        "bearer"
    }

    fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        self.tokens
            .get(token)
            .map(Principal::new)
            .ok_or(AuthError::InvalidCredential)
    }
}
