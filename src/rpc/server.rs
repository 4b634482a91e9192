//! RPC listener.
//!
//! # Responsibilities
//! - Accept TCP connections (optionally TLS, optionally with client certs)
//! - Read request frames, dispatch by method name, write response frames
//! - Run the auth interceptor ahead of dispatch (middleware placement)
//! - Stop accepting on `graceful_stop` and drain within the grace period

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;

use crate::auth::{Authenticator, CertificateIdentity, Credentials, RequestContext, Transport};
use crate::config::RpcConfig;
use crate::echo::{EchoRequest, EchoService, ServiceError, ECHO_METHOD};
use crate::error::TransportError;
use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::Listener;
use crate::net::tls;
use crate::observability::metrics;
use crate::rpc::codec::{self, CodecError, FrameKind};
use crate::rpc::{interceptor, RpcCode, RpcRequest, RpcResponse, RpcStatus, AUTHORIZATION_KEY};
use crate::service::Service;

/// The binary RPC transport.
pub struct RpcService {
    config: RpcConfig,
    handler: Arc<dyn EchoService>,
    interceptor: Option<Authenticator>,
    tls: Option<TlsAcceptor>,
    grace_period: Duration,
    stop: Shutdown,
    tracker: ConnectionTracker,
    bound: watch::Sender<Option<SocketAddr>>,
}

impl RpcService {
    pub fn new(config: RpcConfig, handler: Arc<dyn EchoService>, grace_period: Duration) -> Self {
        Self {
            config,
            handler,
            interceptor: None,
            tls: None,
            grace_period,
            stop: Shutdown::new(),
            tracker: ConnectionTracker::new(),
            bound: watch::channel(None).0,
        }
    }

    /// Authenticate every call before dispatch.
    pub fn with_interceptor(mut self, authenticator: Authenticator) -> Self {
        self.interceptor = Some(authenticator);
        self
    }

    /// Serve over TLS using `config`.
    pub fn with_tls(mut self, config: Arc<rustls::ServerConfig>) -> Self {
        self.tls = Some(TlsAcceptor::from(config));
        self
    }

    /// Address the listener bound to, once it has. Useful with port 0.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let mut rx = self.bound.subscribe();
        let addr = rx.wait_for(Option::is_some).await.ok().and_then(|addr| *addr);
        addr
    }

    pub fn active_connections(&self) -> usize {
        self.tracker.active_count()
    }

    async fn serve(self: Arc<Self>) -> Result<(), TransportError> {
        let mut stop = self.stop.subscribe();
        if stop.is_triggered() {
            tracing::debug!("RPC server stopped before it started");
            return Ok(());
        }

        let listener =
            Listener::bind(&self.config.bind_address, self.config.max_connections).await?;
        let addr = listener.local_addr().map_err(TransportError::Serve)?;
        self.bound.send_replace(Some(addr));

        tracing::info!(
            address = %addr,
            tls = self.tls.is_some(),
            interceptor = self.interceptor.is_some(),
            "RPC server starting"
        );

        loop {
            tokio::select! {
                _ = stop.recv() => break,
                accepted = listener.accept() => {
                    let (stream, peer_addr, permit) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };
                    let guard = self.tracker.track(peer_addr);
                    let service = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = service.handle_connection(stream).await {
                            tracing::debug!(
                                connection_id = %guard.id(),
                                peer_addr = %guard.peer(),
                                error = %e,
                                "Connection closed with error"
                            );
                        }
                        drop(guard);
                    });
                }
            }
        }

        drop(listener);
        tracing::info!(active = self.tracker.active_count(), "RPC server draining");
        if !self.tracker.wait_for_idle(self.grace_period).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Grace period elapsed with connections still open"
            );
        }
        tracing::info!("RPC server stopped");
        Ok(())
    }

    async fn handle_connection(&self, stream: TcpStream) -> Result<(), CodecError> {
        match &self.tls {
            Some(acceptor) => {
                // A silent peer must not hold its permit past the handshake
                // deadline, nor delay the drain.
                let mut stop = self.stop.subscribe();
                let deadline = Duration::from_secs(self.config.handshake_timeout_secs);
                let stream = tokio::select! {
                    _ = stop.recv() => return Ok(()),
                    accepted = tokio::time::timeout(deadline, acceptor.accept(stream)) => {
                        accepted.map_err(|_| {
                            io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out")
                        })??
                    }
                };
                let peer = tls::peer_identity(stream.get_ref().1);
                self.serve_connection(stream, peer).await
            }
            None => self.serve_connection(stream, None).await,
        }
    }

    /// Request/response loop for one connection. Idle connections close as
    /// soon as the server stops; a request already read is still answered.
    async fn serve_connection<S>(
        &self,
        mut stream: S,
        peer: Option<CertificateIdentity>,
    ) -> Result<(), CodecError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stop = self.stop.subscribe();
        loop {
            let frame = tokio::select! {
                _ = stop.recv() => return Ok(()),
                frame = codec::read_frame(&mut stream, self.config.max_frame_bytes) => frame?,
            };
            let Some((kind, payload)) = frame else {
                return Ok(());
            };
            if kind != FrameKind::Request {
                return Err(CodecError::UnexpectedKind(kind));
            }

            let request: RpcRequest = serde_json::from_slice(&payload)?;
            let response = self.dispatch(request, peer.clone());
            codec::write_message(&mut stream, FrameKind::Response, &response).await?;
        }
    }

    fn dispatch(&self, request: RpcRequest, peer: Option<CertificateIdentity>) -> RpcResponse {
        let start = Instant::now();
        let authorization = request.metadata(AUTHORIZATION_KEY).map(str::to_owned);
        let RpcRequest {
            id, method, body, ..
        } = request;
        let mut ctx = RequestContext::new(Transport::Rpc, Credentials::new(peer, authorization));

        let result = match &self.interceptor {
            Some(authenticator) => interceptor::authorize(authenticator, &mut ctx),
            None => Ok(()),
        }
        .and_then(|()| match method.as_str() {
            ECHO_METHOD => self.echo(&mut ctx, body),
            other => Err(RpcStatus::new(
                RpcCode::Unimplemented,
                format!("unknown method '{other}'"),
            )),
        });

        let response = match result {
            Ok(body) => RpcResponse::ok(id, body),
            Err(status) => RpcResponse::error(id, status),
        };
        metrics::record_echo(Transport::Rpc, response.status.code.as_str(), start);
        response
    }

    fn echo(
        &self,
        ctx: &mut RequestContext,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, RpcStatus> {
        let request: EchoRequest = serde_json::from_value(body)
            .map_err(|e| RpcStatus::new(RpcCode::InvalidArgument, e.to_string()))?;

        let response = self.handler.echo(ctx, request).map_err(|err| match err {
            ServiceError::PermissionDenied { error_id } => {
                RpcStatus::new(RpcCode::PermissionDenied, error_id.to_string())
            }
            ServiceError::InvalidArgument(message) => {
                RpcStatus::new(RpcCode::InvalidArgument, message)
            }
        })?;

        serde_json::to_value(response).map_err(|e| RpcStatus::new(RpcCode::Internal, e.to_string()))
    }
}

impl Service for RpcService {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn listen_and_serve(self: Arc<Self>) -> BoxFuture<'static, Result<(), TransportError>> {
        Box::pin(self.serve())
    }

    fn graceful_stop(&self) {
        if self.stop.trigger() {
            tracing::info!("RPC server stop requested");
        }
    }
}
