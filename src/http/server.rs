//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the echo handler
//! - Wire up middleware (tracing, timeout, request ID, auth)
//! - Serve over TLS with client certificate capture, or plaintext
//! - Graceful stop through the axum-server handle

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Extension, Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use futures_util::future::BoxFuture;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{Authenticator, PeerIdentity, Principal, RequestContext, Transport};
use crate::config::HttpConfig;
use crate::echo::{EchoRequest, EchoResponse, EchoService};
use crate::error::TransportError;
use crate::http::acceptor::PeerIdentityAcceptor;
use crate::http::middleware::auth_middleware;
use crate::http::request::{credentials, request_id, X_REQUEST_ID};
use crate::http::response::ApiError;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::service::Service;

/// Path of the echo endpoint.
pub const ECHO_PATH: &str = "/v1/echo";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn EchoService>,
}

/// Build the router. `authenticator` installs the auth middleware in front
/// of every route.
#[allow(deprecated)]
pub fn build_router(
    service: Arc<dyn EchoService>,
    authenticator: Option<Authenticator>,
    request_timeout: Duration,
) -> Router {
    let mut router = Router::new().route(ECHO_PATH, post(echo_handler));
    if let Some(authenticator) = authenticator {
        router = router.route_layer(axum::middleware::from_fn_with_state(
            authenticator,
            auth_middleware,
        ));
    }

    router
        .with_state(AppState { service })
        .layer(TimeoutLayer::new(request_timeout))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid))
}

/// `POST /v1/echo`. The JSON extractor answers `415` for other content types.
async fn echo_handler(
    State(state): State<AppState>,
    peer: Option<Extension<PeerIdentity>>,
    principal: Option<Extension<Principal>>,
    headers: HeaderMap,
    Json(request): Json<EchoRequest>,
) -> Result<Json<EchoResponse>, ApiError> {
    let start = Instant::now();
    let peer = peer.map(|Extension(peer)| peer);
    let mut ctx = RequestContext::new(Transport::Http, credentials(&headers, peer.as_ref()));
    if let Some(Extension(principal)) = principal {
        ctx.attach_principal(principal);
    }

    let result = state.service.echo(&mut ctx, request);
    match &result {
        Ok(_) => metrics::record_echo(Transport::Http, "ok", start),
        Err(err) => {
            tracing::debug!(request_id = request_id(&headers), error = %err, "Echo rejected");
            metrics::record_echo(Transport::Http, "error", start);
        }
    }
    result.map(Json).map_err(ApiError::from)
}

/// The JSON/HTTP transport.
pub struct HttpService {
    config: HttpConfig,
    router: Router,
    tls: Option<Arc<rustls::ServerConfig>>,
    grace_period: Duration,
    handle: Handle,
    stop: Shutdown,
}

impl HttpService {
    pub fn new(
        config: HttpConfig,
        service: Arc<dyn EchoService>,
        authenticator: Option<Authenticator>,
        grace_period: Duration,
    ) -> Self {
        let router = build_router(
            service,
            authenticator,
            Duration::from_secs(config.request_timeout_secs),
        );
        Self {
            config,
            router,
            tls: None,
            grace_period,
            handle: Handle::new(),
            stop: Shutdown::new(),
        }
    }

    /// Serve over TLS using `config`.
    pub fn with_tls(mut self, config: Arc<rustls::ServerConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Address the server is listening on, once it is.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }

    async fn serve(self: Arc<Self>) -> Result<(), TransportError> {
        if self.stop.is_triggered() {
            tracing::debug!("HTTP server stopped before it started");
            return Ok(());
        }

        let address = self.config.bind_address.as_str();
        let bind_error = |source| TransportError::Bind {
            address: address.to_string(),
            source,
        };
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| bind_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
        let listener = std::net::TcpListener::bind(addr).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        tracing::info!(address = %local_addr, tls = self.tls.is_some(), "HTTP server starting");

        let app = self.router.clone().into_make_service();
        let server = axum_server::from_tcp(listener).handle(self.handle.clone());
        match &self.tls {
            Some(config) => {
                let acceptor =
                    PeerIdentityAcceptor::new(RustlsConfig::from_config(Arc::clone(config)));
                server.acceptor(acceptor).serve(app).await
            }
            None => server.serve(app).await,
        }
        .map_err(TransportError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

impl Service for HttpService {
    fn name(&self) -> &'static str {
        "http"
    }

    fn listen_and_serve(self: Arc<Self>) -> BoxFuture<'static, Result<(), TransportError>> {
        Box::pin(self.serve())
    }

    fn graceful_stop(&self) {
        if self.stop.trigger() {
            tracing::info!(grace_period = ?self.grace_period, "HTTP server stop requested");
            self.handle.graceful_shutdown(Some(self.grace_period));
        }
    }
}
