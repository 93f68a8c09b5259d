//! Risk endpoint: open lots priced against live quotes.

use crate::api::{etag_headers, AppState};
use crate::error::AppError;
use crate::orchestration::RiskReport;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

/// Quote failures do not fail the request; they show up in `diagnostics`
/// and the affected lots are priced at entry.
pub async fn get_risk(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<RiskReport>), AppError> {
    let report = state.service.risk().await?;
    Ok((etag_headers(&report.revision), Json(report)))
}
