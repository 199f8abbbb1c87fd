use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use ledger_engine::{EntryDraft, PostCommand};

use crate::ApiState;
use crate::dto::{PostCommandRequest, ReverseRequest, TransactionDto};
use crate::errors::ApiError;

pub async fn post_transaction(
    State(state): State<ApiState>,
    Json(req): Json<PostCommandRequest>,
) -> Result<(StatusCode, Json<TransactionDto>), ApiError> {
    let command = PostCommand {
        external_id: req.external_id,
        event_category: req.event_category,
        entries: req
            .entries
            .into_iter()
            .map(|e| EntryDraft {
                account_id: e.account_id,
                amount: e.amount,
                currency: e.currency,
                side: e.side,
            })
            .collect(),
    };
    let posted = state.poster.post(command).await?;
    Ok((StatusCode::CREATED, Json(posted.into())))
}

pub async fn get_transaction(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionDto>, ApiError> {
    let txn = state.store.get_transaction(&id).await.map_err(crate::map_store_err)?;
    Ok(Json(txn.into()))
}

pub async fn reverse_transaction(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<ReverseRequest>,
) -> Result<(StatusCode, Json<TransactionDto>), ApiError> {
    let reversal = state.reverser.reverse(&id, req.reversal_external_id).await?;
    Ok((StatusCode::CREATED, Json(reversal.into())))
}
