use anyhow::Context;
use lotledger::config::{Config, StoreBackend};
use lotledger::{
    api, init_db, CsvLotStore, FeeSchedule, HttpQuoteSource, LedgerService, LotStore,
    QuoteSource, SqliteLotStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let store: Arc<dyn LotStore> = match &config.backend {
        StoreBackend::Sqlite { database_path } => {
            let pool = init_db(database_path)
                .await
                .with_context(|| format!("failed to initialize database at {}", database_path))?;
            Arc::new(SqliteLotStore::new(pool))
        }
        StoreBackend::Csv { path } => {
            tracing::info!(path = %path, "Using CSV ledger file");
            Arc::new(CsvLotStore::new(path))
        }
    };

    let quotes: Arc<dyn QuoteSource> = Arc::new(HttpQuoteSource::new(
        config.quote_api_url.clone(),
        Duration::from_millis(config.quote_timeout_ms),
    ));

    let service = Arc::new(LedgerService::new(
        store,
        quotes,
        FeeSchedule::new(config.zero_notional_fee),
        config.holding_period_policy,
    ));

    let app = api::create_router(api::AppState::new(service, config));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
