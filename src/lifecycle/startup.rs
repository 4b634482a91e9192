//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the authenticator and TLS material from validated config
//! - Construct both transports with the configured auth placement
//! - Run every transport as an orchestrator action
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Metrics come up before listeners (traffic only when ready)
//! - The shutdown callback stops every transport, not just the survivors

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Authenticator;
use crate::config::{AuthPlacement, GatewayConfig};
use crate::echo::{AuthDecorator, EchoServer, EchoService};
use crate::error::{Error, StartupError};
use crate::http::HttpService;
use crate::lifecycle::{Orchestrator, RunError};
use crate::net::tls::{TlsMaterial, HTTP_ALPN};
use crate::observability::metrics;
use crate::rpc::RpcService;
use crate::service::Service;

/// Build the RPC and HTTP transports described by `config`.
pub fn build_services(config: &GatewayConfig) -> Result<Vec<Arc<dyn Service>>, StartupError> {
    let authenticator = Authenticator::from_config(&config.auth);
    let grace_period = Duration::from_millis(config.shutdown.grace_period_ms);

    let tls = config
        .tls
        .as_ref()
        .map(|tls| TlsMaterial::load(tls, authenticator.allow_list_enabled()))
        .transpose()?;

    let (handler, middleware): (Arc<dyn EchoService>, Option<Authenticator>) =
        match config.auth.placement {
            AuthPlacement::Middleware => (Arc::new(EchoServer::new()), Some(authenticator)),
            AuthPlacement::Decorator => (
                Arc::new(AuthDecorator::new(EchoServer::new(), authenticator)),
                None,
            ),
            AuthPlacement::Anonymous => {
                tracing::warn!("Authentication disabled; every request is served anonymously");
                (Arc::new(EchoServer::new()), None)
            }
        };
    tracing::info!(placement = ?config.auth.placement, "Auth placement");

    let mut rpc = RpcService::new(config.rpc.clone(), Arc::clone(&handler), grace_period);
    if let Some(authenticator) = middleware.clone() {
        rpc = rpc.with_interceptor(authenticator);
    }
    let mut http = HttpService::new(config.http.clone(), handler, middleware, grace_period);

    if let Some(material) = &tls {
        rpc = rpc.with_tls(material.server_config(&[])?);
        http = http.with_tls(material.server_config(HTTP_ALPN)?);
    }

    Ok(vec![Arc::new(rpc), Arc::new(http)])
}

/// Run `services` under `orchestrator` until the first one ends, then stop
/// them all.
pub async fn serve(
    orchestrator: Orchestrator,
    services: Vec<Arc<dyn Service>>,
) -> Result<(), RunError> {
    let mut orchestrator = orchestrator;
    for service in &services {
        orchestrator = orchestrator.action(service.name(), Arc::clone(service).listen_and_serve());
    }

    orchestrator
        .run(move || {
            for service in &services {
                service.graceful_stop();
            }
        })
        .await
}

/// Start metrics, build the transports and serve until shutdown.
pub async fn run(config: GatewayConfig) -> Result<(), Error> {
    if let Some(address) = &config.observability.metrics_address {
        let addr: SocketAddr = address.parse().map_err(|source| StartupError::Address {
            address: address.clone(),
            source,
        })?;
        metrics::init_metrics(addr).map_err(StartupError::from)?;
    }

    let services = build_services(&config)?;
    tracing::info!(
        rpc = %config.rpc.bind_address,
        http = %config.http.bind_address,
        tls = config.tls.is_some(),
        "Starting transports"
    );

    serve(Orchestrator::new(), services).await?;
    Ok(())
}
