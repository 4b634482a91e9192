use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use echo_gateway::net::tls;
use echo_gateway::rpc::RpcClient;

#[derive(Parser)]
#[command(name = "echo-cli")]
#[command(about = "Send an echo request to the echo gateway", long_about = None)]
struct Cli {
    /// Bearer token
    #[arg(short, long)]
    token: Option<String>,

    /// Message to echo
    #[arg(short, long, default_value = "hello")]
    message: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call over the binary RPC transport
    Rpc {
        #[arg(short, long, default_value = "127.0.0.1:8000")]
        address: String,

        /// CA certificate to trust; enables TLS
        #[arg(long)]
        ca_cert: Option<PathBuf>,

        /// Client certificate and key for mutual TLS
        #[arg(long, requires = "client_key", requires = "ca_cert")]
        client_cert: Option<PathBuf>,

        #[arg(long, requires = "client_cert")]
        client_key: Option<PathBuf>,

        /// Name expected on the server certificate
        #[arg(long, default_value = "localhost")]
        server_name: String,
    },
    /// Call over JSON/HTTP
    Http {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rpc {
            address,
            ca_cert,
            client_cert,
            client_key,
            server_name,
        } => {
            let token = cli.token.as_deref();
            let response = match ca_cert {
                Some(ca) => {
                    let roots = tls::load_certs(&ca)?;
                    let identity = match (client_cert, client_key) {
                        (Some(cert), Some(key)) => {
                            Some((tls::load_certs(&cert)?, tls::load_private_key(&key)?))
                        }
                        _ => None,
                    };
                    let config = tls::client_config(&roots, identity)?;
                    let mut client = RpcClient::connect_tls(&address, &server_name, config).await?;
                    client.echo(token, &cli.message).await?
                }
                None => {
                    let mut client = RpcClient::connect(&address).await?;
                    client.echo(token, &cli.message).await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Http { url } => {
            let mut headers = HeaderMap::new();
            if let Some(token) = &cli.token {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", token))?,
                );
            }
            let res = reqwest::Client::new()
                .post(format!("{}/v1/echo", url.trim_end_matches('/')))
                .headers(headers)
                .json(&serde_json::json!({ "message": cli.message }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("{}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
