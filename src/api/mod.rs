pub mod health;
pub mod lots;
pub mod reports;
pub mod risk;

use crate::config::Config;
use crate::orchestration::LedgerService;
use crate::store::Revision;
use axum::{
    http::{header, HeaderMap, HeaderValue},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
    pub config: Config,
}

impl AppState {
    pub fn new(service: Arc<LedgerService>, config: Config) -> Self {
        Self { service, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::ETAG]);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/lots", get(lots::list_lots).post(lots::open_lot))
        .route("/v1/lots/:id", delete(lots::delete_lot))
        .route("/v1/lots/:id/close", post(lots::close_lot))
        .route("/v1/lots/:id/stop-loss", put(lots::update_stop_loss))
        .route("/v1/lots/:id/discount-rate", put(lots::update_discount_rate))
        .route("/v1/lots/:id/note", put(lots::annotate))
        .route("/v1/risk", get(risk::get_risk))
        .route("/v1/reports/summary", get(reports::get_summary))
        .route("/v1/reports/curve", get(reports::get_curve))
        .route("/v1/reports/periods", get(reports::get_periods))
        .route("/v1/reports/holding", get(reports::get_holding))
        .route("/v1/reports/strategies", get(reports::get_strategies))
        .layer(cors)
        .with_state(state)
}

/// `ETag` header carrying a revision, quoted per RFC 9110.
pub(crate) fn etag_headers(revision: &Revision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", revision)) {
        headers.insert(header::ETAG, value);
    }
    headers
}
