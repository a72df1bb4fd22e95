use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use guestbook_api::{AppStateInner, build_router};
use guestbook_chain::{Chain, ChainConfig};
use guestbook_crypto::{Wallet, signature_to_hex};
use guestbook_db::Database;
use guestbook_feed::Dispatcher;
use guestbook_feed::connection::BACKFILL_PAGE;
use guestbook_types::events::{FeedCommand, FeedEvent};
use guestbook_types::{Transaction, TxHash, WEI_PER_ETH, Wei};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve() -> (tempfile::TempDir, Chain, String) {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open(&dir.path().join("feed.db")).unwrap());
    let chain = Chain::open(ChainConfig::default(), db, Dispatcher::new()).await.unwrap();
    let state = Arc::new(AppStateInner {
        chain: chain.clone(),
        jwt_secret: "test".into(),
        admin_address: None,
        explorer_base: "https://sepolia.etherscan.io".into(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    (dir, chain, format!("ws://{}/feed", addr))
}

async fn submit(chain: &Chain, wallet: &Wallet, nonce: u64, message: &str, value: Wei) -> TxHash {
    let tx = Transaction {
        from: wallet.address(),
        nonce,
        gas_limit: 500_000,
        value,
        data: guestbook_abi::encode_sign_guestbook("Visitor", message),
    };
    let signature = signature_to_hex(&wallet.sign_transaction(&tx, chain.config().chain_id).unwrap());
    chain.submit(tx, &signature).await.unwrap()
}

/// Next feed event, skipping control frames.
async fn next_event(socket: &mut Socket) -> FeedEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("feed went quiet")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn backfill(socket: &mut Socket, from_index: u64) {
    let cmd = serde_json::to_string(&FeedCommand::Backfill { from_index }).unwrap();
    socket.send(Message::text(cmd)).await.unwrap();
}

#[tokio::test]
async fn ready_then_paged_backfill_in_ledger_order() {
    let (_dir, chain, url) = serve().await;
    let visitor = Wallet::random();
    let total = BACKFILL_PAGE as u64 + 5;
    for nonce in 0..total {
        submit(&chain, &visitor, nonce, &format!("m{}", nonce), 0).await;
    }
    chain.mine_block_at(100).await.unwrap().unwrap();

    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
    match next_event(&mut socket).await {
        FeedEvent::Ready {
            entry_count,
            block_number,
            ..
        } => {
            assert_eq!(entry_count, total);
            assert_eq!(block_number, 1);
        }
        other => panic!("expected Ready first, got {:?}", other),
    }

    backfill(&mut socket, 3).await;
    for expected in 3..total {
        match next_event(&mut socket).await {
            FeedEvent::EntryAppended { index, entry } => {
                assert_eq!(index, expected);
                assert_eq!(entry.message, format!("m{}", expected));
                assert_eq!(entry.author, visitor.address());
            }
            other => panic!("expected entry {}, got {:?}", expected, other),
        }
    }

    // Past the end (and past anything SQLite can index) replays nothing; the
    // next frame is the live block below.
    backfill(&mut socket, total).await;
    backfill(&mut socket, u64::MAX).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    submit(&chain, &visitor, total, "live", 0).await;
    chain.mine_block_at(101).await.unwrap().unwrap();
    match next_event(&mut socket).await {
        FeedEvent::EntryAppended { index, entry } => {
            assert_eq!(index, total);
            assert_eq!(entry.message, "live");
        }
        other => panic!("expected the live entry, got {:?}", other),
    }
}

#[tokio::test]
async fn live_events_follow_block_order() {
    let (_dir, chain, url) = serve().await;
    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
    let FeedEvent::Ready { entry_count: 0, .. } = next_event(&mut socket).await else {
        panic!("expected an empty ledger");
    };

    let visitor = Wallet::random();
    let whale = Wallet::random();
    let ok = submit(&chain, &visitor, 0, "hello world", 2 * WEI_PER_ETH / 1000).await;
    let broke = submit(&chain, &whale, 0, "too rich", 20_000 * WEI_PER_ETH).await;
    let block = chain.mine_block_at(200).await.unwrap().unwrap();
    assert_eq!(block.transactions, vec![ok, broke]);

    match next_event(&mut socket).await {
        FeedEvent::EntryAppended { index, entry } => {
            assert_eq!(index, 0);
            assert!(entry.has_tipped);
        }
        other => panic!("expected EntryAppended, got {:?}", other),
    }
    match next_event(&mut socket).await {
        FeedEvent::TransactionReverted { tx_hash, .. } => assert_eq!(tx_hash, broke),
        other => panic!("expected TransactionReverted, got {:?}", other),
    }
    match next_event(&mut socket).await {
        FeedEvent::BlockMined {
            number,
            timestamp,
            transaction_count,
        } => {
            assert_eq!(number, 1);
            assert_eq!(timestamp, 200);
            assert_eq!(transaction_count, 2);
        }
        other => panic!("expected BlockMined, got {:?}", other),
    }
}

#[tokio::test]
async fn closing_the_socket_unregisters_the_client() {
    let (_dir, chain, url) = serve().await;
    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
    next_event(&mut socket).await;
    assert_eq!(chain.dispatcher().connection_count().await, 1);

    socket.close(None).await.unwrap();
    for _ in 0..50 {
        if chain.dispatcher().connection_count().await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("feed client still registered after close");
}
