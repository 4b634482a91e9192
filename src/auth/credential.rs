//! Credential kinds understood by the resolver.

use crate::auth::{AuthError, CertificateIdentity};

/// Scheme-qualified token taken from an `Authorization` header or the
/// `authorization` entry of RPC metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCredential {
    pub scheme: String,
    pub token: String,
}

impl TokenCredential {
    /// Split `"<scheme> <token>"`. Both halves must be non-empty.
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        let (scheme, token) = value
            .trim()
            .split_once(' ')
            .ok_or(AuthError::MalformedCredential)?;
        let token = token.trim();
        if scheme.is_empty() || token.is_empty() {
            return Err(AuthError::MalformedCredential);
        }
        Ok(Self {
            scheme: scheme.to_string(),
            token: token.to_string(),
        })
    }
}

/// Every credential kind the resolver can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Certificate(CertificateIdentity),
    Token(TokenCredential),
}

/// What a transport collected for a single request.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Leaf identity of a verified client certificate, if one was sent.
    pub peer: Option<CertificateIdentity>,
    /// Raw authorization value, if one was sent.
    pub authorization: Option<String>,
}

impl Credentials {
    pub fn new(peer: Option<CertificateIdentity>, authorization: Option<String>) -> Self {
        Self {
            peer,
            authorization,
        }
    }

    /// Credentials in layer order: certificate identity first, since it was
    /// established at connection time, then the request-level token.
    ///
    /// A token value that cannot be parsed surfaces as an error entry so the
    /// resolver can report it.
    pub fn layers(&self) -> Vec<Result<Credential, AuthError>> {
        let mut layers = Vec::with_capacity(2);
        if let Some(peer) = &self.peer {
            layers.push(Ok(Credential::Certificate(peer.clone())));
        }
        if let Some(value) = &self.authorization {
            layers.push(TokenCredential::parse(value).map(Credential::Token));
        }
        layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_and_token() {
        let cred = TokenCredential::parse("Bearer wibble").unwrap();
        assert_eq!(cred.scheme, "Bearer");
        assert_eq!(cred.token, "wibble");
    }

    #[test]
    fn rejects_values_without_a_token() {
        assert_eq!(
            TokenCredential::parse("bearer"),
            Err(AuthError::MalformedCredential)
        );
        assert_eq!(
            TokenCredential::parse("bearer   "),
            Err(AuthError::MalformedCredential)
        );
        assert_eq!(TokenCredential::parse(""), Err(AuthError::MalformedCredential));
    }

    #[test]
    fn certificate_layer_comes_first() {
        let creds = Credentials::new(
            Some(CertificateIdentity::new(Some("a.example.com".into()), vec![])),
            Some("bearer wibble".into()),
        );
        let layers = creds.layers();
        assert!(matches!(layers[0], Ok(Credential::Certificate(_))));
        assert!(matches!(layers[1], Ok(Credential::Token(_))));
    }
}
