use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::LedgerError;
use crate::orchestration::ServiceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Precondition required: {0}")]
    PreconditionRequired(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let msg = err.to_string();
        match err {
            ServiceError::Ledger(LedgerError::NotFound { .. }) => AppError::NotFound(msg),
            ServiceError::Ledger(LedgerError::InvalidQuantity { .. })
            | ServiceError::Ledger(LedgerError::InvalidInput(_)) => AppError::BadRequest(msg),
            ServiceError::Conflict { .. } => AppError::Conflict(msg),
            ServiceError::StoreUnavailable(_) => AppError::Unavailable(msg),
            ServiceError::Corrupt(_) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::PreconditionRequired(msg) => (StatusCode::PRECONDITION_REQUIRED, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LotId;
    use crate::store::Revision;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_service_errors_map_to_statuses() {
        let not_found = ServiceError::Ledger(LedgerError::NotFound {
            id: LotId::from("x"),
            wanted: "open",
        });
        assert_eq!(status_of(not_found), StatusCode::NOT_FOUND);

        let qty = ServiceError::Ledger(LedgerError::InvalidQuantity {
            id: LotId::from("x"),
            requested: 5,
            available: 1,
        });
        assert_eq!(status_of(qty), StatusCode::BAD_REQUEST);

        let conflict = ServiceError::Conflict {
            expected: Revision::new("1"),
            actual: Revision::new("2"),
        };
        assert_eq!(status_of(conflict), StatusCode::CONFLICT);

        assert_eq!(
            status_of(ServiceError::StoreUnavailable("down".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ServiceError::Corrupt("bad json".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
