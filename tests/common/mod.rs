//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use echo_gateway::config::{AuthPlacement, GatewayConfig, TlsConfig};
use echo_gateway::lifecycle::startup;
use echo_gateway::{Orchestrator, RunError, Service};

pub const TOKENS: &str = "alice:wibble,bob:wobble";
pub const CLIENT_CN: &str = "client.example.com";

/// Reserve an ephemeral port on localhost.
pub fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Plaintext config on free ports, bearer tokens only.
pub fn token_config(placement: AuthPlacement) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rpc.bind_address = free_addr().to_string();
    config.http.bind_address = free_addr().to_string();
    config.auth.tokens = TOKENS.to_string();
    config.auth.placement = placement;
    config.shutdown.grace_period_ms = 200;
    config
}

/// A running gateway under a signal-less orchestrator.
pub struct Running {
    pub config: GatewayConfig,
    pub services: Vec<Arc<dyn Service>>,
    pub task: JoinHandle<Result<(), RunError>>,
}

impl Running {
    pub fn rpc_addr(&self) -> String {
        self.config.rpc.bind_address.clone()
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.config.http.bind_address)
    }

    /// Stop every transport and wait for the orchestrator to return.
    pub async fn stop(self) -> Result<(), RunError> {
        for service in &self.services {
            service.graceful_stop();
        }
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("gateway did not stop in time")
            .expect("orchestrator task panicked")
    }
}

/// Build and start both transports, waiting until they accept connections.
pub async fn start(config: GatewayConfig) -> Running {
    let services = startup::build_services(&config).unwrap();
    let task = tokio::spawn(startup::serve(
        Orchestrator::new().without_signal_wait(),
        services.clone(),
    ));

    wait_for_port(&config.rpc.bind_address).await;
    wait_for_port(&config.http.bind_address).await;

    Running {
        config,
        services,
        task,
    }
}

pub async fn wait_for_port(addr: &str) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{addr} never started listening");
}

/// A throwaway CA with one server and one client certificate.
pub struct Pki {
    pub ca_pem: String,
    pub ca_der: CertificateDer<'static>,
    pub server_cert_pem: String,
    pub server_key_pem: String,
    pub client_chain: Vec<CertificateDer<'static>>,
    pub client_key: PrivateKeyDer<'static>,
}

impl Pki {
    pub fn generate(client_cn: &str) -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params.distinguished_name.push(DnType::CommonName, "Echo Test CA");
        ca_params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca = ca_params.self_signed(&ca_key).unwrap();

        let server_key = KeyPair::generate().unwrap();
        let mut server_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        server_params.distinguished_name.push(DnType::CommonName, "localhost");
        server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let server = server_params.signed_by(&server_key, &ca, &ca_key).unwrap();

        let client_key = KeyPair::generate().unwrap();
        let mut client_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        client_params.distinguished_name.push(DnType::CommonName, client_cn);
        client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        let client = client_params.signed_by(&client_key, &ca, &ca_key).unwrap();

        Self {
            ca_pem: ca.pem(),
            ca_der: ca.der().clone(),
            server_cert_pem: server.pem(),
            server_key_pem: server_key.serialize_pem(),
            client_chain: vec![client.der().clone()],
            client_key: PrivateKeyDer::Pkcs8(client_key.serialize_der().into()),
        }
    }

    /// Write the server side to disk and return a matching TLS section.
    pub fn write(&self, name: &str) -> TlsConfig {
        let dir = std::env::temp_dir().join(format!("echo-gateway-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let write = |file: &str, body: &str| -> String {
            let path: PathBuf = dir.join(file);
            std::fs::write(&path, body).unwrap();
            path.to_string_lossy().into_owned()
        };
        TlsConfig {
            cert_path: write("server.crt", &self.server_cert_pem),
            key_path: write("server.key", &self.server_key_pem),
            client_ca_path: Some(write("ca.crt", &self.ca_pem)),
        }
    }

    pub fn client_identity(&self) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        (self.client_chain.clone(), self.client_key.clone_key())
    }
}
