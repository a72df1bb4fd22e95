use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use guestbook_abi::{GuestbookCall, decode_entries};
use guestbook_api::auth::ADMIN_LOGIN_MESSAGE;
use guestbook_api::entries::MAX_PAGE;
use guestbook_api::{AppStateInner, build_router};
use guestbook_chain::{Chain, ChainConfig};
use guestbook_crypto::{Wallet, signature_to_hex};
use guestbook_db::Database;
use guestbook_feed::Dispatcher;
use guestbook_types::{Transaction, WEI_PER_ETH};

const JWT_SECRET: &str = "test-secret";

struct Harness {
    _dir: tempfile::TempDir,
    chain: Chain,
    app: Router,
    admin: Wallet,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open(&dir.path().join("api.db")).unwrap());
    let chain = Chain::open(ChainConfig::default(), db, Dispatcher::new()).await.unwrap();
    let admin = Wallet::random();
    let state = Arc::new(AppStateInner {
        chain: chain.clone(),
        jwt_secret: JWT_SECRET.into(),
        admin_address: Some(admin.address()),
        explorer_base: "https://sepolia.etherscan.io".into(),
    });
    Harness {
        _dir: dir,
        chain,
        app: build_router(state),
        admin,
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    // Rejections produced by axum itself are plain text.
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn sign_request(app: &Router, wallet: &Wallet, name: &str, message: &str, value: u128) -> Value {
    let (_, account) = send(app, get(&format!("/accounts/{}", wallet.address()))).await;
    let nonce = account["nonce"].as_u64().unwrap();
    let tx = Transaction {
        from: wallet.address(),
        nonce,
        gas_limit: 500_000,
        value,
        data: guestbook_abi::encode_sign_guestbook(name, message),
    };
    let signature = signature_to_hex(&wallet.sign_transaction(&tx, 31337).unwrap());
    json!({
        "from": wallet.address(),
        "display_name": name,
        "message": message,
        "value": value.to_string(),
        "nonce": nonce,
        "gas_limit": 500_000,
        "signature": signature,
    })
}

#[tokio::test]
async fn sign_then_read_entries() {
    let h = harness().await;
    let visitor = Wallet::random();

    let body = sign_request(&h.app, &visitor, "Visitor", "hello world", 0).await;
    let (status, submitted) = send(&h.app, post("/guestbook/sign", body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let tx_hash = submitted["tx_hash"].as_str().unwrap().to_string();

    let (_, receipt) = send(&h.app, get(&format!("/transactions/{}", tx_hash))).await;
    assert_eq!(receipt["status"], "pending");

    h.chain.mine_block_at(1_700_000_000).await.unwrap();

    let (status, receipt) = send(&h.app, get(&format!("/transactions/{}", tx_hash))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["status"], "success");
    assert_eq!(receipt["entry_index"], 0);

    let (status, entries) = send(&h.app, get("/guestbook/entries")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries["total"], 1);
    let entry = &entries["entries"][0];
    assert_eq!(entry["author"], visitor.address().to_string());
    assert_eq!(entry["message"], "hello world");
    assert_eq!(entry["has_tipped"], false);
    assert_eq!(
        entry["explorer_url"],
        format!("https://sepolia.etherscan.io/address/{}", visitor.address())
    );

    let (status, one) = send(&h.app, get("/guestbook/entries/0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["display_name"], "Visitor");

    let (status, _) = send(&h.app, get("/guestbook/entries/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn windowed_reads_newest_first() {
    let h = harness().await;
    let visitor = Wallet::random();
    for message in ["one", "two", "three"] {
        let body = sign_request(&h.app, &visitor, "Visitor", message, 0).await;
        let (status, _) = send(&h.app, post("/guestbook/sign", body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
    h.chain.mine_block_at(10).await.unwrap();

    let (_, page) = send(&h.app, get("/guestbook/entries?order=desc&limit=2")).await;
    assert_eq!(page["total"], 3);
    let messages: Vec<_> = page["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(messages, ["three", "two"]);
    assert_eq!(page["entries"][0]["index"], 2);

    let (_, page) = send(&h.app, get("/guestbook/entries?offset=1&limit=1")).await;
    assert_eq!(page["entries"][0]["message"], "two");
}

#[tokio::test]
async fn windowed_reads_are_capped() {
    let h = harness().await;
    let visitor = Wallet::random();
    let total = MAX_PAGE as u64 + 1;
    for nonce in 0..total {
        let tx = Transaction {
            from: visitor.address(),
            nonce,
            gas_limit: 500_000,
            value: 0,
            data: guestbook_abi::encode_sign_guestbook("Visitor", &format!("m{}", nonce)),
        };
        let signature = signature_to_hex(&visitor.sign_transaction(&tx, 31337).unwrap());
        h.chain.submit(tx, &signature).await.unwrap();
    }
    h.chain.mine_block_at(10).await.unwrap().unwrap();

    let (status, page) = send(&h.app, get("/guestbook/entries?order=desc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], total);
    assert_eq!(page["entries"].as_array().unwrap().len(), MAX_PAGE as usize);
    assert_eq!(page["entries"][0]["index"], total - 1);

    let (_, page) = send(&h.app, get("/guestbook/entries?limit=100000")).await;
    assert_eq!(page["entries"].as_array().unwrap().len(), MAX_PAGE as usize);

    // Unwindowed reads still return the whole history.
    let (_, all) = send(&h.app, get("/guestbook/entries")).await;
    assert_eq!(all["entries"].as_array().unwrap().len() as u64, total);

    let (status, page) = send(&h.app, get("/guestbook/entries?offset=18446744073709551615")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn tipped_entry_raises_contract_balance() {
    let h = harness().await;
    let tipper = Wallet::random();
    let tip = 2 * WEI_PER_ETH / 1000;

    let body = sign_request(&h.app, &tipper, "0xAAA", "thanks!", tip).await;
    send(&h.app, post("/guestbook/sign", body)).await;
    h.chain.mine_block_at(5).await.unwrap();

    let (_, info) = send(&h.app, get("/guestbook/info")).await;
    assert_eq!(info["entry_count"], 1);
    assert_eq!(info["contract_balance"], tip.to_string());
    assert_eq!(info["chain_id"], 31337);

    let (_, entries) = send(&h.app, get("/guestbook/entries")).await;
    assert_eq!(entries["entries"][0]["has_tipped"], true);
    assert_eq!(entries["entries"][0]["author"], tipper.address().to_string());
}

#[tokio::test]
async fn forged_signature_is_rejected() {
    let h = harness().await;
    let victim = Wallet::random();
    let impostor = Wallet::random();

    let mut body = sign_request(&h.app, &impostor, "Visitor", "not me", 0).await;
    body["from"] = json!(victim.address());
    let (status, err) = send(&h.app, post("/guestbook/sign", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains("rejected"));
}

#[tokio::test]
async fn read_only_call_returns_abi_bytes() {
    let h = harness().await;
    let data = format!("0x{}", hex::encode(&GuestbookCall::GetEntries.encode()));
    let (status, resp) = send(&h.app, post("/call", json!({ "data": data }))).await;
    assert_eq!(status, StatusCode::OK);

    let result = resp["result"].as_str().unwrap().trim_start_matches("0x");
    let bytes = hex::decode(result).unwrap();
    assert!(decode_entries(&bytes).unwrap().is_empty());

    let sign = format!("0x{}", hex::encode(&guestbook_abi::encode_sign_guestbook("a", "b")));
    let (status, _) = send(&h.app, post("/call", json!({ "data": sign }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_login_and_protected_route() {
    let h = harness().await;

    let (status, _) = send(&h.app, get("/admin/transactions")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let outsider = Wallet::random();
    let sig = signature_to_hex(&outsider.sign_message(ADMIN_LOGIN_MESSAGE.as_bytes()).unwrap());
    let (status, _) = send(
        &h.app,
        post("/auth/login", json!({ "address": outsider.address(), "signature": sig })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let sig = signature_to_hex(&h.admin.sign_message(ADMIN_LOGIN_MESSAGE.as_bytes()).unwrap());
    let (status, login) = send(
        &h.app,
        post("/auth/login", json!({ "address": h.admin.address(), "signature": sig })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap();

    let req = Request::get("/admin/transactions?limit=10")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, receipts) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(receipts.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn abi_and_health() {
    let h = harness().await;
    let (status, abi) = send(&h.app, get("/guestbook/abi")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = abi
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains(&"signGuestbook".to_string()));
    assert!(names.contains(&"getEntries".to_string()));

    let (status, health) = send(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let h = harness().await;
    let big = "x".repeat(guestbook_api::MAX_BODY_BYTES + 1);
    let (status, _) = send(&h.app, post("/call", json!({ "data": big }))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
