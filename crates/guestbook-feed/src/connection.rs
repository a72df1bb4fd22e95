use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use guestbook_db::{Database, SortOrder};
use guestbook_types::events::{FeedCommand, FeedEvent};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Entries read per database round trip while backfilling.
pub const BACKFILL_PAGE: u32 = 200;

fn encode(event: &FeedEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            warn!("Failed to serialize feed event: {}", e);
            None
        }
    }
}

/// Serve one live-feed WebSocket until either side goes away.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, db: Arc<Database>) {
    let (mut sender, receiver) = socket.split();
    let conn_id = dispatcher.register_connection().await;

    // Subscribe before reading the ledger height so nothing mined in between is lost.
    let broadcast_rx = dispatcher.subscribe();

    let stats_db = db.clone();
    let stats = tokio::task::spawn_blocking(move || {
        let entry_count = stats_db.entry_count()?;
        let block_number = stats_db.latest_block()?.map_or(0, |b| b.number);
        Ok::<_, anyhow::Error>((entry_count, block_number))
    })
    .await;

    let (entry_count, block_number) = match stats {
        Ok(Ok(stats)) => stats,
        Ok(Err(e)) => {
            warn!("Feed {}: failed to read ledger height: {}", conn_id, e);
            dispatcher.unregister_connection(conn_id).await;
            return;
        }
        Err(e) => {
            warn!("Feed {}: spawn_blocking join error: {}", conn_id, e);
            dispatcher.unregister_connection(conn_id).await;
            return;
        }
    };

    info!("Feed client {} connected (ledger at {} entries)", conn_id, entry_count);

    let ready = FeedEvent::Ready {
        connection_id: conn_id,
        entry_count,
        block_number,
    };
    let sent = match encode(&ready) {
        Some(msg) => sender.send(msg).await.is_ok(),
        None => false,
    };
    if sent {
        run_connection_loop(sender, receiver, broadcast_rx, db, conn_id).await;
    }

    dispatcher.unregister_connection(conn_id).await;
    info!("Feed client {} disconnected", conn_id);
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut broadcast_rx: tokio::sync::broadcast::Receiver<FeedEvent>,
    db: Arc<Database>,
    conn_id: Uuid,
) {
    // Backfill results are delivered through the send task so writes stay on
    // one side. Bounded: a slow socket slows the replay down.
    let (direct_tx, mut direct_rx) = mpsc::channel::<FeedEvent>(BACKFILL_PAGE as usize);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Feed {} lagged by {} events", conn_id, n);
                            continue;
                        }
                        Err(_) => break,
                    };
                    let Some(msg) = encode(&event) else { continue };
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                event = direct_rx.recv() => {
                    let Some(event) = event else { break };
                    let Some(msg) = encode(&event) else { continue };
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Feed {} heartbeat timeout, dropping connection", conn_id);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<FeedCommand>(&text) {
                    Ok(FeedCommand::Backfill { from_index }) => {
                        if let Err(e) = backfill(&db, from_index, &direct_tx).await {
                            warn!("Feed {} backfill from {} failed: {}", conn_id, from_index, e);
                        }
                    }
                    Err(e) => {
                        let raw: String = text.chars().take(200).collect();
                        warn!("Feed {} bad command: {} -- raw: {}", conn_id, e, raw);
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Replay persisted entries from `from_index` onward, in ledger order.
async fn backfill(
    db: &Arc<Database>,
    from_index: u64,
    out: &mpsc::Sender<FeedEvent>,
) -> anyhow::Result<()> {
    let mut next = from_index;
    loop {
        let page_db = db.clone();
        let page = tokio::task::spawn_blocking(move || {
            page_db.entries_window(next, Some(BACKFILL_PAGE), SortOrder::Asc)
        })
        .await??;

        let fetched = page.len();
        for (index, entry) in page {
            next = index + 1;
            if out.send(FeedEvent::EntryAppended { index, entry }).await.is_err() {
                return Ok(());
            }
        }
        if fetched < BACKFILL_PAGE as usize {
            return Ok(());
        }
    }
}
