use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};

use guestbook_feed::connection;

use crate::AppState;

pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.chain.dispatcher().clone();
    let db = state.chain.db().clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, db))
}
