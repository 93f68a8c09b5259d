use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::error::AppError;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the ledger store answers a read.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let revision = state.service.revision().await?;
    Ok(Json(serde_json::json!({"status": "ready", "revision": revision})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StoreBackend};
    use crate::datasource::MockQuoteSource;
    use crate::engine::FeeSchedule;
    use crate::orchestration::LedgerService;
    use crate::store::MemoryLotStore;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn state(store: Arc<MemoryLotStore>) -> AppState {
        let mut env = HashMap::new();
        env.insert("LEDGER_BACKEND".to_string(), "csv".to_string());
        env.insert("LEDGER_CSV_PATH".to_string(), "unused.csv".to_string());
        let config = Config::from_env_map(env).unwrap();
        assert!(matches!(config.backend, StoreBackend::Csv { .. }));

        let service = LedgerService::new(
            store,
            Arc::new(MockQuoteSource::new()),
            FeeSchedule::default(),
            config.holding_period_policy,
        );
        AppState::new(Arc::new(service), config)
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_reports_revision() {
        let Json(body) = ready(State(state(Arc::new(MemoryLotStore::new()))))
            .await
            .unwrap();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["revision"], "0");
    }

    #[tokio::test]
    async fn test_not_ready_when_store_unavailable() {
        let store = Arc::new(MemoryLotStore::new());
        store.set_unavailable(true);
        let err = ready(State(state(store))).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
