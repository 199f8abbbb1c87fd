use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::ApiState;
use crate::dto::{AccountDto, CreateAccountRequest, Page, PaginationQuery};
use crate::errors::ApiError;

pub async fn create_account(
    State(state): State<ApiState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountDto>), ApiError> {
    let account = state.admin.create(req.account_type, req.currency).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

pub async fn get_account(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<AccountDto>, ApiError> {
    let account = state.store.get_account(&id).await.map_err(crate::map_store_err)?;
    Ok(Json(account.into()))
}

pub async fn list_accounts(
    State(state): State<ApiState>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Page<AccountDto>>, ApiError> {
    let all = state.store.list_accounts().await.map_err(crate::map_store_err)?;
    let total = all.len();
    let limit = pagination.limit.unwrap_or(total);
    let items = all
        .into_iter()
        .skip(pagination.offset)
        .take(limit)
        .map(AccountDto::from)
        .collect();
    Ok(Json(Page { items, total }))
}

pub async fn block_account(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<AccountDto>, ApiError> {
    Ok(Json(state.admin.block(&id).await?.into()))
}

pub async fn unblock_account(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<AccountDto>, ApiError> {
    Ok(Json(state.admin.unblock(&id).await?.into()))
}

pub async fn close_account(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<AccountDto>, ApiError> {
    Ok(Json(state.admin.close(&id).await?.into()))
}
