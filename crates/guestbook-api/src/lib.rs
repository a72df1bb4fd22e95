pub mod admin;
pub mod auth;
pub mod entries;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod middleware;
pub mod transactions;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use guestbook_chain::Chain;
use guestbook_types::Address;

pub use error::ApiError;

/// Request bodies above this are refused before reaching a handler.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub chain: Chain,
    pub jwt_secret: String,
    /// Only this address may obtain an admin token. `None` disables admin login.
    pub admin_address: Option<Address>,
    /// Block explorer root used for author links.
    pub explorer_base: String,
}

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/guestbook/entries", get(entries::get_entries))
        .route("/guestbook/entries/{index}", get(entries::get_entry))
        .route("/guestbook/sign", post(transactions::sign_guestbook))
        .route("/guestbook/info", get(ledger::info))
        .route("/guestbook/abi", get(ledger::abi))
        .route("/transactions", post(transactions::submit_transaction))
        .route("/transactions/{hash}", get(transactions::get_receipt))
        .route("/call", post(ledger::call))
        .route("/accounts/{address}", get(ledger::get_account))
        .route("/auth/login", post(auth::login))
        .route("/health", get(ledger::health))
        .route("/feed", get(feed::ws_upgrade));

    let protected_routes = Router::new()
        .route("/admin/transactions", get(admin::recent_transactions))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
