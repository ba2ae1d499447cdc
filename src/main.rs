use anyhow::Context;
use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use vecproxy::{api, config, logging, proxy::ProxyService, upstream::UpstreamClient};

/// Shared-secret HTTP proxy in front of a hosted document-search API.
#[derive(Debug, Parser)]
#[command(name = "vecproxy", version, about)]
struct Cli {
    /// Load environment variables from this file instead of `./.env`.
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,
    /// Listen on this port, overriding `SERVER_PORT`/`PORT`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    config::load_dotenv(cli.env_file.as_deref())?;
    logging::init_tracing();

    let config = Arc::new(config::init_config().context("Failed to load config from environment")?);
    let upstream = UpstreamClient::new(&config).context("Failed to build upstream client")?;
    let service = ProxyService::new(config.clone(), Box::new(upstream))
        .await
        .context("Failed to resolve vector store")?;
    let app = api::create_router(Arc::new(service), api::RouterSettings::from_config(&config));

    let (listener, port) = bind_listener(cli.port.or(config.server_port)).await?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8000..=8099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 8000-8099",
    ))
}
