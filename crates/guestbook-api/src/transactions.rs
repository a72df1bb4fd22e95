use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use guestbook_abi::encode_sign_guestbook;
use guestbook_types::api::{
    ReceiptResponse, SignGuestbookRequest, SubmitResponse, SubmitTransactionRequest,
};
use guestbook_types::{Transaction, TxHash};

use crate::AppState;
use crate::error::ApiError;

/// Raw submission of pre-encoded calldata.
pub async fn submit_transaction(
    State(state): State<AppState>,
    Json(req): Json<SubmitTransactionRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let tx = Transaction {
        from: req.from,
        nonce: req.nonce,
        gas_limit: req.gas_limit,
        value: req.value,
        data: req.data,
    };
    let tx_hash = state.chain.submit(tx, &req.signature).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { tx_hash })))
}

/// `signGuestbook(displayName, message)` with the calldata built here. The
/// signature must cover the transaction exactly as built.
pub async fn sign_guestbook(
    State(state): State<AppState>,
    Json(req): Json<SignGuestbookRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let tx = Transaction {
        from: req.from,
        nonce: req.nonce,
        gas_limit: req.gas_limit,
        value: req.value,
        data: encode_sign_guestbook(&req.display_name, &req.message),
    };
    let tx_hash = state.chain.submit(tx, &req.signature).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { tx_hash })))
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let hash: TxHash = hash
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid transaction hash: {}", e)))?;
    let receipt = state
        .chain
        .receipt(&hash)
        .await?
        .ok_or(ApiError::NotFound("transaction"))?;
    Ok(Json(receipt))
}
