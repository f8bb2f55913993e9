use std::sync::Arc;

use anyhow::Context;

use stockflow_infra::{Config, InMemoryStore, PostgresStore, Store, StoreBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockflow_observability::init();

    let config = Config::from_env().context("invalid configuration")?;

    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("STOCKFLOW_STORE=memory; data is lost on restart");
            serve(Arc::new(InMemoryStore::new()), &config).await
        }
        StoreBackend::Postgres => {
            let store = PostgresStore::connect(&config.store)
                .await
                .context("failed to connect to Postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to apply schema")?;
            serve(Arc::new(store), &config).await
        }
    }
}

async fn serve<S: Store>(store: Arc<S>, config: &Config) -> anyhow::Result<()> {
    let app = stockflow_api::app::build_app(store, config);

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        receipt_policy = config.receipt_policy.as_str(),
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
