//! Layered credential resolution.
//!
//! The certificate layer runs first, then the token layer. The first layer
//! that yields a principal wins. HTTP middleware, the RPC interceptor and
//! the echo decorator all call into [`Authenticator`] so the policy lives in
//! exactly one place.

use std::sync::Arc;

use crate::auth::{
    AllowList, AuthDenied, AuthError, BearerAuth, Credential, Credentials, DomainAllowList,
    ErrorId, Principal, TokenAuth, Transport,
};
use crate::config::AuthConfig;
use crate::observability::metrics;

/// Resolves request credentials into a [`Principal`].
#[derive(Clone, Default)]
pub struct Authenticator {
    token_auth: Option<Arc<dyn TokenAuth>>,
    allow_list: Option<Arc<dyn AllowList>>,
}

impl Authenticator {
    pub fn new(
        token_auth: Option<Arc<dyn TokenAuth>>,
        allow_list: Option<Arc<dyn AllowList>>,
    ) -> Self {
        Self {
            token_auth,
            allow_list,
        }
    }

    /// Bearer tokens plus a domain allow-list, both from configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        let bearer = BearerAuth::from_pairs(&config.tokens);
        let allow_list = DomainAllowList::from_domains(&config.allowed_domains);

        tracing::info!(
            tokens = bearer.len(),
            allow_list_enabled = allow_list.enabled(),
            "Authenticator configured"
        );

        Self::new(Some(Arc::new(bearer)), Some(Arc::new(allow_list)))
    }

    /// Whether certificate identities can authenticate at all.
    pub fn allow_list_enabled(&self) -> bool {
        self.allow_list.as_ref().is_some_and(|list| list.enabled())
    }

    /// Run every applicable layer and return the first principal found.
    ///
    /// Layers that do not apply (no certificate presented, allow-list
    /// disabled, no token resolver) are skipped without leaving a cause.
    pub fn resolve(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let mut causes = Vec::new();

        for layer in credentials.layers() {
            let outcome = match layer {
                Ok(credential) => self.resolve_credential(&credential),
                // Unparseable tokens only matter if tokens are accepted at all.
                Err(err) => self.token_auth.as_ref().map(|_| Err(err)),
            };
            match outcome {
                Some(Ok(principal)) => return Ok(principal),
                Some(Err(err)) => causes.push(err),
                None => {}
            }
        }

        if causes.is_empty() {
            causes.push(AuthError::MissingCredentials);
        }
        Err(AuthError::PermissionDenied { causes })
    }

    /// `None` when no configured layer handles this kind of credential.
    fn resolve_credential(&self, credential: &Credential) -> Option<Result<Principal, AuthError>> {
        match credential {
            Credential::Certificate(identity) => {
                let allow_list = self.allow_list.as_ref().filter(|list| list.enabled())?;
                Some(allow_list.allow(identity))
            }
            Credential::Token(token) => {
                let auth = self.token_auth.as_ref()?;
                if !token.scheme.eq_ignore_ascii_case(auth.scheme()) {
                    return Some(Err(AuthError::UnsupportedScheme {
                        scheme: token.scheme.clone(),
                    }));
                }
                Some(auth.authenticate(&token.token))
            }
        }
    }

    /// Resolve and, on failure, mint an [`ErrorId`] that is logged with the
    /// real cause. Only the id is handed back.
    pub fn authenticate(
        &self,
        transport: Transport,
        credentials: &Credentials,
    ) -> Result<Principal, AuthDenied> {
        match self.resolve(credentials) {
            Ok(principal) => {
                tracing::debug!(
                    transport = transport.as_str(),
                    principal = %principal,
                    "Request authenticated"
                );
                metrics::record_auth(transport, true);
                Ok(principal)
            }
            Err(err) => {
                let error_id = ErrorId::new();
                tracing::warn!(
                    transport = transport.as_str(),
                    error_id = %error_id,
                    error = %err,
                    "Authentication failed"
                );
                metrics::record_auth(transport, false);
                Err(AuthDenied { error_id })
            }
        }
    }
}
