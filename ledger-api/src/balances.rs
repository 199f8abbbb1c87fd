use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;

use crate::ApiState;
use crate::dto::{AsOfQuery, BalanceDto};
use crate::errors::ApiError;

pub async fn get_balance(
    State(state): State<ApiState>,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceDto>, ApiError> {
    let now = Utc::now();
    let balance = state.balances.get_balance_as_of(&account_id, now).await?;
    Ok(Json(BalanceDto::new(account_id, &balance, now)))
}

pub async fn get_balance_as_of(
    State(state): State<ApiState>,
    Path(account_id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<BalanceDto>, ApiError> {
    let balance = state.balances.get_balance_as_of(&account_id, query.time).await?;
    Ok(Json(BalanceDto::new(account_id, &balance, query.time)))
}
