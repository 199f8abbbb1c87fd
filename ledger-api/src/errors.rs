use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledger_core::LedgerError;
use serde::Serialize;

/// RFC 7807 Problem Details body. `type` is omitted (defaults to
/// "about:blank" per the RFC) since this service has no per-kind
/// documentation URIs to point to.
#[derive(Debug, Serialize)]
struct ProblemDetails {
    title: &'static str,
    status: u16,
    detail: String,
}

pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, title) = match &self.0 {
            LedgerError::InvalidArg(_) => (StatusCode::BAD_REQUEST, "invalid argument"),
            LedgerError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "account not found"),
            LedgerError::AccountNotActive(_) => (StatusCode::CONFLICT, "account not active"),
            LedgerError::CurrencyMismatch(_) => (StatusCode::BAD_REQUEST, "currency mismatch"),
            LedgerError::Unbalanced(_) => (StatusCode::BAD_REQUEST, "entries unbalanced"),
            LedgerError::TooFewEntries(_) => (StatusCode::BAD_REQUEST, "too few entries"),
            LedgerError::DuplicateExternalId(_) => (StatusCode::CONFLICT, "duplicate external id"),
            LedgerError::NotReversible(_) => (StatusCode::CONFLICT, "transaction not reversible"),
            LedgerError::TransactionNotFound(_) => (StatusCode::NOT_FOUND, "transaction not found"),
            LedgerError::InvalidAccountStateTransition(_) => {
                (StatusCode::CONFLICT, "invalid account state transition")
            }
            LedgerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };

        let body = ProblemDetails {
            title,
            status: status.as_u16(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
