use axum::{
    Extension, Json,
    extract::{Query, State},
};
use tracing::debug;

use guestbook_types::Receipt;
use guestbook_types::api::{Claims, ReceiptQuery};

use crate::AppState;
use crate::error::ApiError;

/// Recent receipts, newest first, reverts included.
pub async fn recent_transactions(
    State(state): State<AppState>,
    Query(query): Query<ReceiptQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Receipt>>, ApiError> {
    let limit = query.limit.min(500);
    debug!("Admin {} listing {} recent transactions", claims.sub.short(), limit);

    let db = state.chain.db().clone();
    let receipts = tokio::task::spawn_blocking(move || db.recent_receipts(limit)).await??;
    Ok(Json(receipts))
}
