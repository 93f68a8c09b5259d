//! Performance reports over closed lots.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AppState;
use crate::engine::reporting::{CurvePoint, HoldingPeriod, PeriodTotal, StrategyTotal, Summary};
use crate::engine::Period;
use crate::error::AppError;
use crate::store::Revision;

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub revision: Revision,
    pub summary: Summary,
}

#[derive(Debug, Serialize)]
pub struct CurveResponse {
    pub revision: Revision,
    pub curve: Vec<CurvePoint>,
}

#[derive(Debug, Serialize)]
pub struct PeriodsResponse {
    pub revision: Revision,
    pub period: Period,
    pub periods: Vec<PeriodTotal>,
}

#[derive(Debug, Serialize)]
pub struct HoldingResponse {
    pub revision: Revision,
    pub holding: Vec<HoldingPeriod>,
    pub distribution: BTreeMap<i64, usize>,
}

#[derive(Debug, Serialize)]
pub struct StrategiesResponse {
    pub revision: Revision,
    pub strategies: Vec<StrategyTotal>,
}

fn parse_period(raw: Option<&str>) -> Result<Period, AppError> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("month") => Ok(Period::Month),
        Some("week") => Ok(Period::Week),
        Some(other) => Err(AppError::BadRequest(format!(
            "period must be week or month, got {}",
            other
        ))),
    }
}

pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, AppError> {
    let report = state.service.report(Period::Month).await?;
    Ok(Json(SummaryResponse {
        revision: report.revision,
        summary: report.summary,
    }))
}

pub async fn get_curve(State(state): State<AppState>) -> Result<Json<CurveResponse>, AppError> {
    let report = state.service.report(Period::Month).await?;
    Ok(Json(CurveResponse {
        revision: report.revision,
        curve: report.curve,
    }))
}

pub async fn get_periods(
    Query(params): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<PeriodsResponse>, AppError> {
    let period = parse_period(params.period.as_deref())?;
    let report = state.service.report(period).await?;
    Ok(Json(PeriodsResponse {
        revision: report.revision,
        period,
        periods: report.periods,
    }))
}

pub async fn get_holding(
    State(state): State<AppState>,
) -> Result<Json<HoldingResponse>, AppError> {
    let report = state.service.report(Period::Month).await?;
    Ok(Json(HoldingResponse {
        revision: report.revision,
        holding: report.holding,
        distribution: report.holding_distribution,
    }))
}

pub async fn get_strategies(
    State(state): State<AppState>,
) -> Result<Json<StrategiesResponse>, AppError> {
    let report = state.service.report(Period::Month).await?;
    Ok(Json(StrategiesResponse {
        revision: report.revision,
        strategies: report.strategies,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period(None).unwrap(), Period::Month);
        assert_eq!(parse_period(Some("Week")).unwrap(), Period::Week);
        assert_eq!(parse_period(Some("month")).unwrap(), Period::Month);
        assert!(parse_period(Some("quarter")).is_err());
    }
}
