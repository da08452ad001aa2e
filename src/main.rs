use docdesk::config::AppConfig;
use docdesk::domain::DocumentType;
use docdesk::handlers;
use docdesk::infrastructure::database::{DocumentStore, SqliteStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::info!("Starting docdesk v{}", env!("CARGO_PKG_VERSION"));

    if let Some(dir) = config.db_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    // Create the schema up front and report what is already stored
    let store = SqliteStore::new(&config.db_path)?;
    for doc_type in DocumentType::ALL {
        let collection = doc_type.config().collection;
        tracing::info!(collection, count = store.count(collection)?, "collection ready");
    }
    drop(store);

    let (addr, server) = handlers::bind(Arc::new(config), shutdown_signal())?;
    tracing::info!(%addr, "Listening");

    server.await?;
    Ok(())
}
