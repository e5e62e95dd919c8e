use axum::serve;
use family_tree_rust::build_app;
use family_tree_rust::config::AppConfig;
use family_tree_rust::seed;
use family_tree_rust::store::InMemoryStore;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("tower_http", LevelFilter::Warn)
        .init();

    log::info!("Family tree service starting");

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{}",
        config.server.host,
        config.server.port
    );

    let store = Arc::new(InMemoryStore::new());

    if config.should_load_seed() {
        log::info!("Loading seed data...");
        seed::load_seed_data(&*store).await?;
    }

    let app = build_app(store, config.layout.clone());

    run_server(app, &config).await
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Family tree service running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
