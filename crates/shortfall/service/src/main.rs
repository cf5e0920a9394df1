use clap::Parser;
use shortfall_service::{build_router, ServiceConfig, ServiceState, StorageConfig};
use std::net::SocketAddr;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "shortfalld", version, about = "Shortage-request workflow REST service")]
struct Cli {
    /// REST socket address to bind, e.g. 127.0.0.1:8095
    #[arg(long, default_value = "127.0.0.1:8095")]
    listen: SocketAddr,
    /// PostgreSQL url for request/user/product persistence.
    #[cfg(feature = "postgres")]
    #[arg(long, env = "SHORTFALL_DATABASE_URL")]
    database_url: Option<String>,
    /// Max PostgreSQL pool connections.
    #[cfg(feature = "postgres")]
    #[arg(long, default_value_t = 5, env = "SHORTFALL_PG_MAX_CONNECTIONS")]
    pg_max_connections: u32,
}

/// Pick postgres when a database url is configured, memory otherwise.
#[cfg(feature = "postgres")]
fn resolve_storage(cli: &Cli) -> StorageConfig {
    let resolved_url = cli
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok());

    match resolved_url {
        Some(database_url) => StorageConfig::postgres(database_url, cli.pg_max_connections),
        None => StorageConfig::memory(),
    }
}

#[cfg(not(feature = "postgres"))]
fn resolve_storage(_cli: &Cli) -> StorageConfig {
    StorageConfig::memory()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "shortfall_service=info,info".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let storage = resolve_storage(&cli);
    let config = ServiceConfig { storage };
    let state = ServiceState::bootstrap(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!("shortfall-service listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
