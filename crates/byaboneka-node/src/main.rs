mod app;
mod config;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use byaboneka_service::queue::run_match_worker;
use byaboneka_service::reaper::{run_reaper, ReaperConfig};
use byaboneka_service::DynStore;
use byaboneka_store::PgStore;

use crate::config::NodeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ------------------------------------------------------
    // Load config from environment
    // ------------------------------------------------------
    let cfg = NodeConfig::load()?;

    // ------------------------------------------------------
    // Initialize structured logging
    // ------------------------------------------------------
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "byaboneka_node={level},byaboneka_api={level},byaboneka_service={level},byaboneka_store={level}",
                    level = cfg.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    println!();
    println!("  Byaboneka+ trust & handover node");
    println!();
    cfg.print_summary();
    println!();

    // ------------------------------------------------------
    // Storage: bounded pool + migrations
    // ------------------------------------------------------
    let pool = byaboneka_store::connect(&cfg.database_url, cfg.max_connections).await?;
    let store: DynStore = Arc::new(PgStore::new(pool));

    // ------------------------------------------------------
    // Services & background workers
    // ------------------------------------------------------
    let app = app::build(&cfg, store.clone());

    tokio::spawn(run_match_worker(
        app.matching.clone(),
        app.queue_rx,
        app.match_budget,
    ));
    tokio::spawn(run_reaper(
        store,
        ReaperConfig {
            interval: Duration::from_secs(cfg.reaper_interval_secs),
            ..ReaperConfig::default()
        },
    ));

    // ------------------------------------------------------
    // Router with CORS
    // ------------------------------------------------------
    let cors = if cfg.allow_origin == "*" {
        CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any)
    } else {
        CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(cfg.allow_origin.parse::<axum::http::HeaderValue>()?)
    };
    let router = byaboneka_api::build_router(app.ctx).layer(cors);

    // ------------------------------------------------------
    // Bind and serve
    // ------------------------------------------------------
    tracing::info!(listen_addr = %cfg.listen_addr, "byaboneka node starting");
    println!("  Listening on http://{}", cfg.listen_addr);
    println!("    POST /api/v1/auth/*        auth & tokens");
    println!("    POST /api/v1/lost-items    report a lost item");
    println!("    POST /api/v1/found-items   report a found item");
    println!("    POST /api/v1/claims        open a claim");
    println!("    GET  /health               health check");
    println!();

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to install shutdown handler");
    }
    tracing::info!("shutdown signal received");
}
