//! Certificate identities presented by mutually-authenticated peers.

use rustls::pki_types::CertificateDer;
use x509_parser::extensions::GeneralName;

/// Names carried by the leaf certificate of a verified peer chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateIdentity {
    pub common_name: Option<String>,
    pub dns_names: Vec<String>,
}

impl CertificateIdentity {
    pub fn new(common_name: Option<String>, dns_names: Vec<String>) -> Self {
        Self {
            common_name,
            dns_names,
        }
    }

    /// Parse the subject CN and DNS subject-alternative names out of a DER
    /// encoded certificate. Returns `None` when the bytes are not a
    /// certificate we can read.
    pub fn from_der(der: &[u8]) -> Option<Self> {
        let (_, cert) = x509_parser::parse_x509_certificate(der).ok()?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_owned);

        let dns_names = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_owned()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            common_name,
            dns_names,
        })
    }

    /// Identity of the first (leaf) certificate of a peer chain.
    pub fn from_peer_chain(chain: &[CertificateDer<'_>]) -> Option<Self> {
        let leaf = chain.first()?;
        let identity = Self::from_der(leaf.as_ref());
        if identity.is_none() {
            tracing::warn!("Peer presented a certificate that could not be parsed");
        }
        identity
    }

    /// Names in the order they are checked against an allow-list.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.common_name
            .as_deref()
            .into_iter()
            .chain(self.dns_names.iter().map(String::as_str))
    }
}

/// Connection-level peer identity, attached to every HTTP request served on
/// a TLS connection. `None` when the peer sent no client certificate.
#[derive(Debug, Clone, Default)]
pub struct PeerIdentity(pub Option<CertificateIdentity>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_lists_cn_before_sans() {
        let identity = CertificateIdentity::new(
            Some("cn.example.com".into()),
            vec!["a.example.com".into(), "b.example.com".into()],
        );
        let names: Vec<_> = identity.names().collect();
        assert_eq!(names, ["cn.example.com", "a.example.com", "b.example.com"]);
    }

    #[test]
    fn garbage_der_is_not_an_identity() {
        assert!(CertificateIdentity::from_der(b"not a certificate").is_none());
        assert!(CertificateIdentity::from_peer_chain(&[]).is_none());
    }

    #[test]
    fn parses_names_from_generated_certificate() {
        let mut params =
            rcgen::CertificateParams::new(vec!["alt.example.com".to_string()]).unwrap();
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "server.example.com");
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();

        let identity = CertificateIdentity::from_der(cert.der()).unwrap();
        assert_eq!(identity.common_name.as_deref(), Some("server.example.com"));
        assert_eq!(identity.dns_names, vec!["alt.example.com".to_string()]);
    }
}
