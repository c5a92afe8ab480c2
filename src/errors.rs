use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ledger::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    kind: &'static str,
    error: String,
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Ledger(e) => {
                let status = match e {
                    LedgerError::InvalidRecipient(_)
                    | LedgerError::InvalidTransaction(_)
                    | LedgerError::InvalidAmount(_)
                    | LedgerError::CurrencyMismatch { .. } => StatusCode::BAD_REQUEST,
                    LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
                    LedgerError::DuplicateHash(_)
                    | LedgerError::InvalidTransition { .. }
                    | LedgerError::AlreadyAllocated(_)
                    | LedgerError::AlreadyWithdrawn(_) => StatusCode::CONFLICT,
                    LedgerError::AllocationRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, e.kind())
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "Internal server error".into()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                kind,
                error: message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_ledger_errors_map_to_statuses() {
        let cases = [
            (LedgerError::InvalidRecipient("x".into()), StatusCode::BAD_REQUEST),
            (LedgerError::not_found("recipient", "r1"), StatusCode::NOT_FOUND),
            (LedgerError::DuplicateHash("0x1".into()), StatusCode::CONFLICT),
            (LedgerError::AlreadyWithdrawn(Uuid::nil()), StatusCode::CONFLICT),
            (
                LedgerError::AllocationRejected {
                    transaction_id: Uuid::nil(),
                    reason: "invalid split".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (error, expected) in cases {
            let response = AppError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
