use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::warn;

use guestbook_types::Entry;
use guestbook_types::api::{EntriesQuery, EntriesResponse, EntryResponse, SortOrder};

use crate::AppState;
use crate::error::ApiError;

/// Largest page a windowed read returns.
pub const MAX_PAGE: u32 = 500;

fn to_response(index: u64, entry: Entry, explorer_base: &str) -> EntryResponse {
    let created_at = chrono::DateTime::from_timestamp(entry.timestamp as i64, 0).unwrap_or_else(|| {
        warn!("Entry {} has out-of-range timestamp {}", index, entry.timestamp);
        chrono::DateTime::default()
    });
    EntryResponse {
        index,
        explorer_url: entry.author.explorer_url(explorer_base),
        created_at,
        entry,
    }
}

/// Without query parameters this is `getEntries()`: every entry, oldest first.
/// `offset`, `limit` and `order` switch to a windowed read from the database,
/// at most [`MAX_PAGE`] entries long.
pub async fn get_entries(
    State(state): State<AppState>,
    Query(query): Query<EntriesQuery>,
) -> Result<Json<EntriesResponse>, ApiError> {
    let total = state.chain.entry_count().await;

    let windowed = query.offset.is_some() || query.limit.is_some() || query.order != SortOrder::Asc;
    let rows: Vec<(u64, Entry)> = if windowed {
        let db = state.chain.db().clone();
        let offset = query.offset.unwrap_or(0);
        let limit = Some(query.limit.map_or(MAX_PAGE, |l| l.min(MAX_PAGE)));
        tokio::task::spawn_blocking(move || db.entries_window(offset, limit, query.order)).await??
    } else {
        state
            .chain
            .entries()
            .await
            .into_iter()
            .enumerate()
            .map(|(i, e)| (i as u64, e))
            .collect()
    };

    let entries = rows
        .into_iter()
        .map(|(index, entry)| to_response(index, entry, &state.explorer_base))
        .collect();

    Ok(Json(EntriesResponse { total, entries }))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(index): Path<u64>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = state.chain.entry(index).await.ok_or(ApiError::NotFound("entry"))?;
    Ok(Json(to_response(index, entry, &state.explorer_base)))
}
