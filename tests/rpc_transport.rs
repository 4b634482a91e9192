//! Binary RPC transport: token auth, mutual TLS and graceful stop.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use echo_gateway::config::AuthPlacement;
use echo_gateway::echo::ECHO_METHOD;
use echo_gateway::net::tls;
use echo_gateway::rpc::codec::{self, HEADER_LEN, MAGIC, VERSION};
use echo_gateway::rpc::{ClientError, RpcClient, RpcCode};

mod common;

fn assert_denied(err: ClientError) {
    match err {
        ClientError::Status(status) => {
            assert_eq!(status.code, RpcCode::PermissionDenied);
            assert_eq!(status.message.len(), 7, "message should be just the error id");
        }
        other => panic!("expected permission denied, got {other}"),
    }
}

#[tokio::test]
async fn token_auth_over_rpc() {
    for placement in [AuthPlacement::Middleware, AuthPlacement::Decorator] {
        let running = common::start(common::token_config(placement)).await;
        let mut client = RpcClient::connect(&running.rpc_addr()).await.unwrap();

        let response = client.echo(Some("wibble"), "G'day").await.unwrap();
        assert_eq!(response.message, "G'day");

        // Same connection keeps working after a denial.
        assert_denied(client.echo(Some("nope"), "G'day").await.unwrap_err());
        assert_denied(client.echo(None, "G'day").await.unwrap_err());
        assert!(client.echo(Some("wobble"), "again").await.is_ok());

        running.stop().await.unwrap();
    }
}

#[tokio::test]
async fn unknown_method_is_unimplemented() {
    let running = common::start(common::token_config(AuthPlacement::Anonymous)).await;
    let mut client = RpcClient::connect(&running.rpc_addr()).await.unwrap();

    let response = client
        .call("example.Example/Shout", BTreeMap::new(), json!({}))
        .await
        .unwrap();
    assert_eq!(response.status.code, RpcCode::Unimplemented);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn authorization_metadata_key_ignores_case() {
    let running = common::start(common::token_config(AuthPlacement::Middleware)).await;
    let mut client = RpcClient::connect(&running.rpc_addr()).await.unwrap();

    let metadata = BTreeMap::from([("Authorization".to_string(), "Bearer wibble".to_string())]);
    let response = client
        .call(ECHO_METHOD, metadata, json!({"message": "mixed case"}))
        .await
        .unwrap();
    assert!(response.status.is_ok());
    assert_eq!(response.body.unwrap()["message"], "mixed case");

    running.stop().await.unwrap();
}

#[tokio::test]
async fn oversized_frame_closes_only_that_connection() {
    let mut config = common::token_config(AuthPlacement::Middleware);
    config.rpc.max_frame_bytes = 64;
    let running = common::start(config).await;

    let mut raw = TcpStream::connect(running.rpc_addr()).await.unwrap();
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(&MAGIC.to_be_bytes());
    header.extend_from_slice(&VERSION.to_be_bytes());
    header.extend_from_slice(&1u16.to_be_bytes());
    header.extend_from_slice(&1_000u32.to_be_bytes());
    raw.write_all(&header).await.unwrap();
    assert!(codec::read_frame(&mut raw, 1024).await.unwrap_or(None).is_none());

    let mut client = RpcClient::connect(&running.rpc_addr()).await.unwrap();
    assert!(client.echo(Some("wibble"), "small").await.is_ok());

    running.stop().await.unwrap();
}

#[tokio::test]
async fn client_certificate_authenticates_over_mutual_tls() {
    let pki = common::Pki::generate(common::CLIENT_CN);

    for placement in [AuthPlacement::Middleware, AuthPlacement::Decorator] {
        let mut config = common::token_config(placement);
        config.tls = Some(pki.write(&format!("{placement:?}")));
        config.auth.allowed_domains = common::CLIENT_CN.to_string();
        let running = common::start(config).await;
        let roots = [pki.ca_der.clone()];

        // Certificate alone is enough, and it wins over a bad token.
        let with_cert = tls::client_config(&roots, Some(pki.client_identity())).unwrap();
        let mut client = RpcClient::connect_tls(&running.rpc_addr(), "localhost", with_cert)
            .await
            .unwrap();
        assert_eq!(client.echo(None, "cert").await.unwrap().message, "cert");
        assert!(client.echo(Some("nope"), "cert").await.is_ok());

        // Without a certificate the token layer decides.
        let without_cert = tls::client_config(&roots, None).unwrap();
        let mut client = RpcClient::connect_tls(&running.rpc_addr(), "localhost", without_cert)
            .await
            .unwrap();
        assert!(client.echo(Some("wibble"), "token").await.is_ok());
        assert_denied(client.echo(None, "token").await.unwrap_err());

        running.stop().await.unwrap();
    }
}

#[tokio::test]
async fn certificate_outside_allow_list_is_denied() {
    let pki = common::Pki::generate("intruder.example.org");
    let mut config = common::token_config(AuthPlacement::Middleware);
    config.tls = Some(pki.write("intruder"));
    config.auth.allowed_domains = common::CLIENT_CN.to_string();
    let running = common::start(config).await;

    let client_config =
        tls::client_config(&[pki.ca_der.clone()], Some(pki.client_identity())).unwrap();
    let mut client = RpcClient::connect_tls(&running.rpc_addr(), "localhost", client_config)
        .await
        .unwrap();
    assert_denied(client.echo(None, "hi").await.unwrap_err());

    running.stop().await.unwrap();
}

fn mtls_config(pki: &common::Pki, name: &str) -> echo_gateway::GatewayConfig {
    let mut config = common::token_config(AuthPlacement::Middleware);
    config.tls = Some(pki.write(name));
    config.auth.allowed_domains = common::CLIENT_CN.to_string();
    config
}

#[tokio::test]
async fn silent_peer_cannot_hold_the_last_permit() {
    let pki = common::Pki::generate(common::CLIENT_CN);
    let mut config = mtls_config(&pki, "silent-peer");
    config.rpc.max_connections = 1;
    config.rpc.handshake_timeout_secs = 1;
    let running = common::start(config).await;

    // Connects but never sends a ClientHello.
    let mut silent = TcpStream::connect(running.rpc_addr()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let client_config =
        tls::client_config(&[pki.ca_der.clone()], Some(pki.client_identity())).unwrap();
    let served = tokio::time::timeout(Duration::from_secs(5), async {
        let mut client = RpcClient::connect_tls(&running.rpc_addr(), "localhost", client_config)
            .await
            .unwrap();
        client.echo(None, "still served").await.unwrap()
    })
    .await
    .expect("client starved by a stalled handshake");
    assert_eq!(served.message, "still served");

    let mut buf = [0u8; 1];
    assert_eq!(silent.read(&mut buf).await.unwrap(), 0);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn stalled_handshake_does_not_delay_drain() {
    let pki = common::Pki::generate(common::CLIENT_CN);
    let mut config = mtls_config(&pki, "stalled-drain");
    config.rpc.handshake_timeout_secs = 60;
    config.shutdown.grace_period_ms = 30_000;
    let running = common::start(config).await;

    let _silent = TcpStream::connect(running.rpc_addr()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    running.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn graceful_stop_closes_idle_connections() {
    let running = common::start(common::token_config(AuthPlacement::Middleware)).await;
    let addr = running.rpc_addr();
    let mut client = RpcClient::connect(&addr).await.unwrap();
    assert!(client.echo(Some("wibble"), "before").await.is_ok());

    // Returns even though the client still holds its connection open.
    running.stop().await.unwrap();

    assert!(client.echo(Some("wibble"), "after").await.is_err());
    assert!(RpcClient::connect(&addr).await.is_err());
}
