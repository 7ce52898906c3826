#![forbid(unsafe_code)]

use std::net::SocketAddr;

use palisade_server::{build_router, init_tracing, AppConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let max_created_guilds_per_user = std::env::var("PALISADE_MAX_CREATED_GUILDS_PER_USER")
        .map_or_else(
            |_| Ok(AppConfig::default().max_created_guilds_per_user),
            |value| {
                value.parse::<usize>().map_err(|e| {
                    anyhow::anyhow!(
                        "invalid PALISADE_MAX_CREATED_GUILDS_PER_USER value {value:?}: {e}"
                    )
                })
            },
        )?;
    let app_config = AppConfig {
        sync_ingest_token: std::env::var("PALISADE_SYNC_INGEST_TOKEN").ok(),
        max_created_guilds_per_user,
        ..AppConfig::default()
    };
    let app = build_router(&app_config)?;
    let addr = std::env::var("PALISADE_BIND_ADDR")
        .unwrap_or_else(|_| String::from("0.0.0.0:3000"))
        .parse::<SocketAddr>()
        .map_err(|e| anyhow::anyhow!("invalid PALISADE_BIND_ADDR: {e}"))?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "palisade-server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
