use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use featuredesk::config::AppConfig;
use featuredesk::database::models::{FeatureEntry, Stage};
use featuredesk::database::models::stage::STAGE_BLINK_ORIGIN_TRIAL;
use featuredesk::database::store::MemoryStore;
use featuredesk::{router, AppState};

#[derive(Parser)]
#[command(name = "featuredesk")]
#[command(about = "Feature tracking web service: pages, JSON API and guarded entity updates")]
#[command(version)]
struct Args {
    #[arg(long, default_value = "0.0.0.0", help = "Address to bind")]
    bind: String,

    #[arg(long, help = "Port to listen on (overrides FEATUREDESK_PORT/PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Seed the in-memory store with a sample feature and trial stage")]
    demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so secrets and permission lists can live there in development
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!("Starting featuredesk in {:?} mode", config.environment);

    let store = Arc::new(MemoryStore::new());
    if args.demo {
        seed_demo(&store)?;
    }

    let bind_addr = format!("{}:{}", args.bind, config.server.port);
    let state = Arc::new(AppState::with_store(config, store));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn seed_demo(store: &MemoryStore) -> anyhow::Result<()> {
    let mut feature = FeatureEntry::new(1, "Demo feature");
    feature.summary = "A feature seeded for local development".to_string();
    feature.owner_emails = vec!["owner@example.com".to_string()];
    feature.blink_components = vec!["Blink".to_string()];
    store.insert(feature)?;
    store.insert(Stage::new(10, 1, STAGE_BLINK_ORIGIN_TRIAL))?;
    tracing::info!("Seeded demo feature 1 with origin trial stage 10");
    Ok(())
}
