//! Minimal client for the RPC transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::echo::{EchoRequest, EchoResponse, ECHO_METHOD};
use crate::rpc::codec::{self, CodecError, FrameKind};
use crate::rpc::{RpcRequest, RpcResponse, RpcStatus, AUTHORIZATION_KEY};

/// Largest response frame the client accepts.
const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error("invalid server name '{0}'")]
    ServerName(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("server closed the connection")]
    Closed,
    #[error("response id {actual} does not match request id {expected}")]
    Mismatched { expected: u64, actual: u64 },
    #[error("call failed: {0}")]
    Status(#[from] RpcStatus),
    #[error("cannot decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One connection, one call at a time.
pub struct RpcClient<S> {
    stream: S,
    next_id: u64,
}

impl RpcClient<TcpStream> {
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        Ok(Self::new(stream))
    }
}

impl RpcClient<TlsStream<TcpStream>> {
    pub async fn connect_tls(
        addr: &str,
        server_name: &str,
        config: Arc<rustls::ClientConfig>,
    ) -> Result<Self, ClientError> {
        let name = ServerName::try_from(server_name.to_owned())
            .map_err(|_| ClientError::ServerName(server_name.to_owned()))?;
        let tcp = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        let stream = TlsConnector::from(config)
            .connect(name, tcp)
            .await
            .map_err(ClientError::Connect)?;
        Ok(Self::new(stream))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> RpcClient<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, next_id: 1 }
    }

    /// Send one request and wait for its response, whatever its status.
    pub async fn call(
        &mut self,
        method: &str,
        metadata: BTreeMap<String, String>,
        body: serde_json::Value,
    ) -> Result<RpcResponse, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = RpcRequest {
            id,
            method: method.to_string(),
            metadata,
            body,
        };
        codec::write_message(&mut self.stream, FrameKind::Request, &request).await?;

        let (kind, payload) = codec::read_frame(&mut self.stream, MAX_RESPONSE_BYTES)
            .await?
            .ok_or(ClientError::Closed)?;
        if kind != FrameKind::Response {
            return Err(CodecError::UnexpectedKind(kind).into());
        }
        let response: RpcResponse = serde_json::from_slice(&payload)?;
        if response.id != id {
            return Err(ClientError::Mismatched {
                expected: id,
                actual: response.id,
            });
        }
        Ok(response)
    }

    /// Call the echo method, sending `token` as a bearer credential.
    pub async fn echo(
        &mut self,
        token: Option<&str>,
        message: &str,
    ) -> Result<EchoResponse, ClientError> {
        let mut metadata = BTreeMap::new();
        if let Some(token) = token {
            metadata.insert(AUTHORIZATION_KEY.to_string(), format!("Bearer {token}"));
        }
        let body = serde_json::to_value(EchoRequest {
            message: message.to_string(),
        })?;

        let response = self.call(ECHO_METHOD, metadata, body).await?;
        if !response.status.is_ok() {
            return Err(response.status.into());
        }
        Ok(serde_json::from_value(response.body.unwrap_or_default())?)
    }
}
