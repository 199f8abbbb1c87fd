#![deny(clippy::print_stdout, clippy::print_stderr)]

//! HTTP surface over `ledger-engine`: REST routes for accounts,
//! transactions, and balances, with RFC 7807 Problem Details error
//! rendering. Authentication and role checks happen upstream of this
//! crate; handlers receive an already-authorized request.

mod accounts;
mod balances;
mod dto;
mod errors;
mod transactions;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use ledger_core::LedgerError;
use ledger_engine::{AccountAdmin, BalanceEngine, LedgerPoster, Reverser};
use ledger_store::{LedgerStore, StoreError};
use tower_http::trace::TraceLayer;

pub use errors::ApiError;

#[derive(Clone)]
pub struct ApiState {
    store: Arc<dyn LedgerStore>,
    admin: Arc<AccountAdmin>,
    poster: Arc<LedgerPoster>,
    reverser: Arc<Reverser>,
    balances: Arc<BalanceEngine>,
}

impl ApiState {
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        admin: Arc<AccountAdmin>,
        poster: Arc<LedgerPoster>,
        reverser: Arc<Reverser>,
        balances: Arc<BalanceEngine>,
    ) -> Self {
        Self { store, admin, poster, reverser, balances }
    }
}

fn map_store_err(err: StoreError) -> ApiError {
    let mapped = match err {
        StoreError::AccountNotFound(id) => LedgerError::AccountNotFound(id),
        StoreError::TransactionNotFound(id) => LedgerError::TransactionNotFound(id),
        StoreError::DuplicateExternalId(id) => LedgerError::DuplicateExternalId(id),
        StoreError::InvalidAccountStateTransition(msg) => LedgerError::InvalidAccountStateTransition(msg),
        StoreError::Storage(msg) => LedgerError::Internal(msg),
    };
    ApiError(mapped)
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/accounts", post(accounts::create_account).get(accounts::list_accounts))
        .route("/api/v1/accounts/{id}", get(accounts::get_account))
        .route("/api/v1/accounts/{id}/block", post(accounts::block_account))
        .route("/api/v1/accounts/{id}/unblock", post(accounts::unblock_account))
        .route("/api/v1/accounts/{id}/close", post(accounts::close_account))
        .route("/api/v1/transactions", post(transactions::post_transaction))
        .route("/api/v1/transactions/{id}", get(transactions::get_transaction))
        .route("/api/v1/transactions/{id}/reverse", post(transactions::reverse_transaction))
        .route("/api/v1/balances/{account_id}", get(balances::get_balance))
        .route("/api/v1/balances/{account_id}/as-of", get(balances::get_balance_as_of))
        .route("/actuator/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use ledger_core::{AccountStatus, AccountType, Clock, FixedClock, IdGen, UuidGen};
    use ledger_store::InMemoryLedgerStore;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn make_state() -> ApiState {
        let store: Arc<dyn LedgerStore> = Arc::new(InMemoryLedgerStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Utc::now()));
        let ids: Arc<dyn IdGen> = Arc::new(UuidGen);
        ApiState::new(
            store.clone(),
            Arc::new(AccountAdmin::new(store.clone(), clock.clone(), ids.clone())),
            Arc::new(LedgerPoster::new(store.clone(), clock.clone(), ids.clone())),
            Arc::new(Reverser::new(store.clone(), clock.clone(), ids.clone())),
            Arc::new(BalanceEngine::new(store)),
        )
    }

    #[tokio::test]
    async fn health_endpoint_ok() {
        let app = router(make_state());
        let response = app
            .oneshot(Request::builder().uri("/actuator/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_account_then_fetch_it() {
        let app = router(make_state());
        let create_request = Request::builder()
            .method("POST")
            .uri("/api/v1/accounts")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"accountType":"ASSET","currency":"BRL"}"#))
            .expect("request");
        let response = app.clone().oneshot(create_request).await.expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let account: dto::AccountDto = serde_json::from_slice(&body).expect("decode");
        assert_eq!(account.account_type, AccountType::Asset);
        assert_eq!(account.status, AccountStatus::Active);

        let get_request = Request::builder()
            .uri(format!("/api/v1/accounts/{}", account.id))
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(get_request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_missing_account_is_404() {
        let app = router(make_state());
        let request = Request::builder()
            .uri("/api/v1/accounts/does-not-exist")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
