use meeple_api::{
    api::{create_router, AppState},
    catalog::Catalog,
    config::Config,
    services::providers::CfScorer,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeple_api=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let catalog = Catalog::load_csv(&config.catalog_path)?;
    tracing::info!(games = catalog.len(), path = %config.catalog_path, "Catalog loaded");

    let cf = match &config.embeddings_path {
        Some(path) => {
            let scorer = CfScorer::from_json_file(path)?;
            tracing::info!(path = %path, "Item embeddings loaded");
            scorer
        }
        None => {
            tracing::warn!("No embeddings configured, CF signal disabled");
            CfScorer::disabled()
        }
    };

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, catalog, cf);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
