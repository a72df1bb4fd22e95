use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use guestbook_abi::abi_json;
use guestbook_types::Address;
use guestbook_types::api::{AccountResponse, CallRequest, CallResponse, LedgerInfoResponse};

use crate::AppState;
use crate::error::ApiError;

/// Read-only contract call; nothing is queued and nothing is charged.
pub async fn call(
    State(state): State<AppState>,
    Json(req): Json<CallRequest>,
) -> Result<Json<CallResponse>, ApiError> {
    let result = state.chain.call(&req.data).await.map_err(ApiError::Reverted)?;
    Ok(Json(CallResponse { result }))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let address: Address = address
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid address: {}", e)))?;
    let account = state.chain.account(&address).await;
    Ok(Json(AccountResponse {
        address,
        balance: account.balance,
        nonce: account.nonce,
    }))
}

pub async fn info(State(state): State<AppState>) -> Json<LedgerInfoResponse> {
    Json(state.chain.info().await)
}

pub async fn abi() -> Json<Value> {
    Json(abi_json())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
