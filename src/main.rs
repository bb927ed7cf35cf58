use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tillgate::{GatewayConfig, HttpRequester, PaymentGateway, server};

#[derive(Parser, Debug)]
#[command(name = "tillgate", about = "A GraphQL payment checkout gateway service")]
struct Cli {
    /// Port the checkout HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[command(flatten)]
    gateway: GatewayConfig,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.port));
    let gateway = Arc::new(PaymentGateway::new(cli.gateway, Box::new(HttpRequester::new())));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "checkout server listening");

    server::serve(listener, gateway).await
}
