//! bgc-catalog (Board Game Catalog) - game ingestion and lookup service
//!
//! Accepts game data directly or fetches it from BoardGameGeek by id,
//! normalizes metadata against the shared catalog, and serves lookup
//! endpoints.

use anyhow::Result;
use bgc_catalog::ingest::BggClient;
use bgc_catalog::{build_router, AppState};
use bgc_common::config::{database_path, resolve_port, resolve_root_folder};
use bgc_common::db::init_database;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "bgc-catalog", about = "Board game catalog service")]
struct Args {
    /// Root folder holding the database (overrides BGC_ROOT_FOLDER)
    #[arg(long)]
    root_folder: Option<String>,

    /// HTTP listen port (overrides BGC_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting BGC Catalog (bgc-catalog) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "BGC_ROOT_FOLDER");
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    bgc_catalog::db::initialize_schema(&pool).await?;

    let state = AppState::new(pool, Arc::new(BggClient::new()));
    let app = build_router(state);

    let port = resolve_port(args.port, "BGC_PORT");
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("bgc-catalog listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
