use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transit_store::app_config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transit_store=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!(backend = ?config.store.backend, "Preparing document store");

    let store = transit_store::connect(&config.store)
        .await
        .context("Failed to connect to document store")?;

    let added = transit_store::seed_routes(store.as_ref(), &config.routes.seed)
        .await
        .context("Failed to seed canonical routes")?;

    tracing::info!(added, "Document store ready");
    Ok(())
}
