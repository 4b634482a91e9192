//! Request-side helpers.
//!
//! # Responsibilities
//! - Request ID header shared by the set/propagate layers
//! - Collect the credentials an HTTP request carries

use axum::http::{header, HeaderMap, HeaderName};

use crate::auth::{Credentials, PeerIdentity};

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Peer certificate (from the TLS acceptor) plus the `Authorization` header.
///
/// A header value that is not valid UTF-8 is kept lossily so the resolver
/// rejects it instead of treating the request as credential-less.
pub fn credentials(headers: &HeaderMap, peer: Option<&PeerIdentity>) -> Credentials {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
    let peer = peer.and_then(|PeerIdentity(identity)| identity.clone());
    Credentials::new(peer, authorization)
}

/// Request ID assigned by the request-id layer, for log correlation.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CertificateIdentity;
    use axum::http::HeaderValue;

    #[test]
    fn collects_header_and_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer wibble"));
        let peer = PeerIdentity(Some(CertificateIdentity::new(Some("client".into()), vec![])));

        let creds = credentials(&headers, Some(&peer));
        assert_eq!(creds.authorization.as_deref(), Some("Bearer wibble"));
        assert_eq!(creds.peer.unwrap().common_name.as_deref(), Some("client"));
    }

    #[test]
    fn nothing_presented() {
        let creds = credentials(&HeaderMap::new(), Some(&PeerIdentity(None)));
        assert!(creds.authorization.is_none());
        assert!(creds.peer.is_none());
        assert_eq!(request_id(&HeaderMap::new()), "unknown");
    }
}
