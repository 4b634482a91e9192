//! TLS acceptor that records the client certificate on every request.

use std::io;

use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tower_http::add_extension::AddExtension;

use crate::auth::PeerIdentity;
use crate::net::tls;

/// Wraps [`RustlsAcceptor`] and adds a [`PeerIdentity`] extension to the
/// connection's service once the handshake is done.
#[derive(Clone)]
pub struct PeerIdentityAcceptor {
    inner: RustlsAcceptor,
}

impl PeerIdentityAcceptor {
    pub fn new(config: RustlsConfig) -> Self {
        Self {
            inner: RustlsAcceptor::new(config),
        }
    }
}

impl<I, S> Accept<I, S> for PeerIdentityAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = TlsStream<I>;
    type Service = AddExtension<S, PeerIdentity>;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let acceptor = self.inner.clone();
        Box::pin(async move {
            let (stream, service) = acceptor.accept(stream, service).await?;
            let peer = tls::peer_identity(stream.get_ref().1);
            if let Some(identity) = &peer {
                tracing::debug!(
                    common_name = ?identity.common_name,
                    "Client certificate presented"
                );
            }
            Ok((stream, AddExtension::new(service, PeerIdentity(peer))))
        })
    }
}
