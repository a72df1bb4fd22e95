mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use guestbook_api::{AppStateInner, build_router};
use guestbook_chain::{Chain, run_miner_loop};
use guestbook_db::Database;
use guestbook_feed::Dispatcher;
use guestbook_types::models::format_eth;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guestbook=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.admin_address.is_none() {
        warn!("GUESTBOOK_ADMIN_ADDRESS not set; admin login is disabled");
    }

    // Init database and restore ledger state
    let db = Arc::new(Database::open(&config.db_path)?);
    let dispatcher = Dispatcher::new();
    let chain = Chain::open(config.chain.clone(), db, dispatcher).await?;

    let info = chain.info().await;
    info!(
        "Guestbook contract {} on chain {}: {} entries, {} ETH in tips",
        info.contract_address,
        info.chain_id,
        info.entry_count,
        format_eth(info.contract_balance)
    );

    // Block production
    tokio::spawn(run_miner_loop(chain.clone(), config.chain.block_interval));

    let state = Arc::new(AppStateInner {
        chain,
        jwt_secret: config.jwt_secret,
        admin_address: config.admin_address,
        explorer_base: config.explorer_url,
    });

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Guestbook node listening on {}", addr);
    info!("Mining every {} ms", config.chain.block_interval.as_millis());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
