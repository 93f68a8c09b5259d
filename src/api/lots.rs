//! Lot commands and the open/closed views.
//!
//! Every mutation must name the revision it was computed against in
//! `If-Match`; the response carries the new revision in the body and `ETag`.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{etag_headers, AppState};
use crate::domain::{Decimal, Lot, LotId, LotStatus, OpenLotRequest, Symbol};
use crate::engine::{CloseOutcome, Settlement};
use crate::error::AppError;
use crate::store::Revision;

#[derive(Debug, Deserialize)]
pub struct LotsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LotsResponse {
    pub revision: Revision,
    pub lots: Vec<Lot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenLotBody {
    pub symbol: String,
    #[serde(default)]
    pub strategy: String,
    pub entry_price: Decimal,
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    pub quantity: u64,
    /// Falls back to the configured default discount.
    #[serde(default)]
    pub discount_rate: Option<Decimal>,
    /// Defaults to today.
    #[serde(default)]
    pub open_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseLotBody {
    pub exit_price: Decimal,
    pub quantity: u64,
    #[serde(default)]
    pub exit_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopLossBody {
    pub stop_loss: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRateBody {
    pub discount_rate: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct NoteBody {
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct OpenedResponse {
    pub revision: Revision,
    pub id: LotId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedResponse {
    pub revision: Revision,
    /// "full" or "split".
    pub kind: &'static str,
    pub closed_lot_id: LotId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_lot_id: Option<LotId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    pub settlement: Settlement,
}

#[derive(Debug, Serialize)]
pub struct RevisionResponse {
    pub revision: Revision,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub revision: Revision,
    pub deleted: Lot,
}

type Committed<T> = (StatusCode, HeaderMap, Json<T>);

fn committed<T>(status: StatusCode, revision: &Revision, body: T) -> Committed<T> {
    (status, etag_headers(revision), Json(body))
}

/// Revision from `If-Match`, accepting quoted and weak forms.
fn expected_revision(headers: &HeaderMap) -> Result<Revision, AppError> {
    let raw = headers
        .get(header::IF_MATCH)
        .ok_or_else(|| {
            AppError::PreconditionRequired("If-Match header with the ledger revision".to_string())
        })?
        .to_str()
        .map_err(|_| AppError::BadRequest("If-Match is not valid text".to_string()))?;

    let token = raw.trim();
    let token = token.strip_prefix("W/").unwrap_or(token);
    let token = token.trim_matches('"');
    if token.is_empty() {
        return Err(AppError::BadRequest("If-Match is empty".to_string()));
    }
    Ok(Revision::new(token))
}

fn parse_status(raw: Option<&str>) -> Result<Option<LotStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<LotStatus>()
            .map(Some)
            .map_err(|e| AppError::BadRequest(e.to_string())),
    }
}

pub async fn list_lots(
    Query(params): Query<LotsQuery>,
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<LotsResponse>), AppError> {
    let status = parse_status(params.status.as_deref())?;
    let view = state.service.view(status).await?;
    Ok((
        etag_headers(&view.revision),
        Json(LotsResponse {
            revision: view.revision,
            lots: view.lots,
        }),
    ))
}

pub async fn open_lot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OpenLotBody>,
) -> Result<Committed<OpenedResponse>, AppError> {
    let expected = expected_revision(&headers)?;
    let request = OpenLotRequest {
        symbol: Symbol::new(body.symbol.trim().to_string()),
        strategy: body.strategy,
        entry_price: body.entry_price,
        stop_loss: body.stop_loss.unwrap_or_default(),
        quantity: body.quantity,
        discount_rate: body
            .discount_rate
            .unwrap_or(state.config.default_discount_rate),
        open_date: body.open_date.unwrap_or_else(|| Local::now().date_naive()),
    };

    let result = state.service.open_lot(&expected, request).await?;
    Ok(committed(
        StatusCode::CREATED,
        &result.revision,
        OpenedResponse {
            revision: result.revision.clone(),
            id: result.outcome,
        },
    ))
}

pub async fn close_lot(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CloseLotBody>,
) -> Result<Committed<ClosedResponse>, AppError> {
    let expected = expected_revision(&headers)?;
    let exit_date = body.exit_date.unwrap_or_else(|| Local::now().date_naive());

    let result = state
        .service
        .close_lot(
            &expected,
            &LotId::new(id),
            body.exit_price,
            body.quantity,
            exit_date,
        )
        .await?;

    let revision = result.revision.clone();
    let response = match result.outcome {
        CloseOutcome::Full { lot_id, settlement } => ClosedResponse {
            revision,
            kind: "full",
            closed_lot_id: lot_id,
            open_lot_id: None,
            remaining: None,
            settlement,
        },
        CloseOutcome::Split {
            open_lot_id,
            closed_lot_id,
            remaining,
            settlement,
        } => ClosedResponse {
            revision,
            kind: "split",
            closed_lot_id,
            open_lot_id: Some(open_lot_id),
            remaining: Some(remaining),
            settlement,
        },
    };
    Ok(committed(StatusCode::OK, &result.revision, response))
}

pub async fn update_stop_loss(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<StopLossBody>,
) -> Result<Committed<RevisionResponse>, AppError> {
    let expected = expected_revision(&headers)?;
    let result = state
        .service
        .update_stop_loss(&expected, &LotId::new(id), body.stop_loss)
        .await?;
    Ok(committed(
        StatusCode::OK,
        &result.revision,
        RevisionResponse {
            revision: result.revision.clone(),
        },
    ))
}

pub async fn update_discount_rate(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DiscountRateBody>,
) -> Result<Committed<RevisionResponse>, AppError> {
    let expected = expected_revision(&headers)?;
    let result = state
        .service
        .update_discount_rate(&expected, &LotId::new(id), body.discount_rate)
        .await?;
    Ok(committed(
        StatusCode::OK,
        &result.revision,
        RevisionResponse {
            revision: result.revision.clone(),
        },
    ))
}

pub async fn annotate(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NoteBody>,
) -> Result<Committed<RevisionResponse>, AppError> {
    let expected = expected_revision(&headers)?;
    let result = state
        .service
        .annotate(&expected, &LotId::new(id), body.note)
        .await?;
    Ok(committed(
        StatusCode::OK,
        &result.revision,
        RevisionResponse {
            revision: result.revision.clone(),
        },
    ))
}

pub async fn delete_lot(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Committed<DeletedResponse>, AppError> {
    let expected = expected_revision(&headers)?;
    let result = state
        .service
        .delete_lot(&expected, &LotId::new(id))
        .await?;
    Ok(committed(
        StatusCode::OK,
        &result.revision,
        DeletedResponse {
            revision: result.revision.clone(),
            deleted: result.outcome,
        },
    ))
}
