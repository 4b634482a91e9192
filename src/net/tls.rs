//! TLS configuration and certificate loading.
//!
//! Both listeners share the same server certificate. When client
//! verification is on, a client certificate is requested and verified
//! against the configured CA, but not required: requests without one fall
//! through to token authentication.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, RootCertStore, ServerConfig, ServerConnection};

use crate::auth::CertificateIdentity;
use crate::config::TlsConfig;

/// ALPN protocols offered by the HTTP listener.
pub const HTTP_ALPN: &[&[u8]] = &[b"h2", b"http/1.1"];

/// Error type for TLS setup.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),
    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),
    #[error(transparent)]
    Rustls(#[from] rustls::Error),
    #[error("client verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

/// Crypto backend used for every rustls config we build.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::aws_lc_rs::default_provider())
}

/// Certificates, key and optional client CA roots for a listener.
#[derive(Debug)]
pub struct TlsMaterial {
    pub cert_chain: Vec<CertificateDer<'static>>,
    pub private_key: PrivateKeyDer<'static>,
    /// Roots for verifying client certificates. `None` disables client
    /// certificate requests entirely.
    pub client_roots: Option<Vec<CertificateDer<'static>>>,
}

impl TlsMaterial {
    /// Load PEM files named by `config`. Client roots are only loaded when
    /// `verify_clients` is set and a CA path is configured.
    pub fn load(config: &TlsConfig, verify_clients: bool) -> Result<Self, TlsError> {
        let cert_chain = load_certs(Path::new(&config.cert_path))?;
        let private_key = load_private_key(Path::new(&config.key_path))?;
        let client_roots = match (&config.client_ca_path, verify_clients) {
            (Some(path), true) => Some(load_certs(Path::new(path))?),
            _ => None,
        };

        tracing::info!(
            cert_path = %config.cert_path,
            client_verification = client_roots.is_some(),
            "TLS material loaded"
        );

        Ok(Self {
            cert_chain,
            private_key,
            client_roots,
        })
    }

    pub fn verifies_clients(&self) -> bool {
        self.client_roots.is_some()
    }

    /// Build a rustls server config advertising `alpn`.
    pub fn server_config(&self, alpn: &[&[u8]]) -> Result<Arc<ServerConfig>, TlsError> {
        let provider = crypto_provider();
        let builder = ServerConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()?;

        let builder = match &self.client_roots {
            Some(certs) => {
                let mut roots = RootCertStore::empty();
                for cert in certs {
                    roots.add(cert.clone())?;
                }
                // if we wanted mTLS to be mandatory we would drop allow_unauthenticated()
                let verifier =
                    WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                        .allow_unauthenticated()
                        .build()?;
                builder.with_client_cert_verifier(verifier)
            }
            None => builder.with_no_client_auth(),
        };

        let mut config =
            builder.with_single_cert(self.cert_chain.clone(), self.private_key.clone_key())?;
        config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
        Ok(Arc::new(config))
    }
}

/// Client-side config trusting `roots`, presenting `identity` when given.
pub fn client_config(
    roots: &[CertificateDer<'static>],
    identity: Option<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)>,
) -> Result<Arc<ClientConfig>, TlsError> {
    let mut store = RootCertStore::empty();
    for cert in roots {
        store.add(cert.clone())?;
    }
    let builder = ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()?
        .with_root_certificates(store);
    let config = match identity {
        Some((chain, key)) => builder.with_client_auth_cert(chain, key)?,
        None => builder.with_no_client_auth(),
    };
    Ok(Arc::new(config))
}

/// Read every certificate from a PEM file.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

/// Read the first private key from a PEM file.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Identity of the verified client certificate on `conn`, if any.
pub fn peer_identity(conn: &ServerConnection) -> Option<CertificateIdentity> {
    conn.peer_certificates()
        .and_then(CertificateIdentity::from_peer_chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_reported_with_path() {
        let config = TlsConfig {
            cert_path: "/nonexistent/server.crt".into(),
            key_path: "/nonexistent/server.key".into(),
            client_ca_path: None,
        };
        let err = TlsMaterial::load(&config, false).unwrap_err();
        assert!(matches!(err, TlsError::Io { ref path, .. } if path.ends_with("server.crt")));
    }

    #[test]
    fn builds_config_from_generated_material() {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let material = TlsMaterial {
            cert_chain: vec![cert.der().clone()],
            private_key: PrivateKeyDer::Pkcs8(key_pair.serialize_der().into()),
            client_roots: Some(vec![cert.der().clone()]),
        };
        assert!(material.verifies_clients());

        let config = material.server_config(HTTP_ALPN).unwrap();
        assert_eq!(config.alpn_protocols.len(), 2);
    }
}
