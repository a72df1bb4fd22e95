//! HTTP client for a guestbook node.
//!
//! Reads go through the contract's own ABI (`getEntries()` via `/call`) and
//! are decoded locally. Writes are signed with a local [`Wallet`] and submitted
//! as `signGuestbook` transactions; the returned hash can then be polled until
//! the transaction lands or reverts.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use guestbook_abi::gas::required_gas;
use guestbook_abi::{AbiError, GuestbookCall, decode_entries};
use guestbook_crypto::{CryptoError, Wallet, signature_to_hex};
use guestbook_types::api::{
    AccountResponse, CallRequest, CallResponse, ErrorResponse, LedgerInfoResponse,
    SignGuestbookRequest, SubmitResponse,
};
use guestbook_types::{Address, Entry, Receipt, Transaction, TxHash, TxStatus, WEI_PER_ETH, Wei};

/// Tip attached by the "sign with tip" flow: 0.002 ETH.
pub const DEFAULT_TIP_WEI: Wei = 2 * WEI_PER_ETH / 1000;

/// Longest message `sign` accepts by default, in characters. The contract
/// itself takes any length; see [`GuestbookClient::with_message_limit`].
pub const DEFAULT_MESSAGE_LIMIT: usize = 140;

/// Extra gas on top of the node's own estimate, in percent.
const GAS_HEADROOM_PERCENT: u64 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("node returned {status}: {message}")]
    Node { status: StatusCode, message: String },

    #[error("signing failed: {0}")]
    Signing(#[from] CryptoError),

    #[error("undecodable contract response: {0}")]
    Abi(#[from] AbiError),

    #[error("timed out waiting for {0}")]
    Timeout(TxHash),

    #[error("message is {len} characters; the limit is {limit}")]
    MessageTooLong { len: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct GuestbookClient {
    http: Client,
    base_url: String,
    message_limit: Option<usize>,
}

impl GuestbookClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            message_limit: Some(DEFAULT_MESSAGE_LIMIT),
        }
    }

    /// `None` lifts the client-side cap.
    pub fn with_message_limit(mut self, limit: Option<usize>) -> Self {
        self.message_limit = limit;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn info(&self) -> Result<LedgerInfoResponse> {
        let resp = self.http.get(self.url("/guestbook/info")).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn account(&self, address: &Address) -> Result<AccountResponse> {
        let resp = self
            .http
            .get(self.url(&format!("/accounts/{}", address)))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// `getEntries()`: the whole ledger in insertion order.
    pub async fn entries(&self) -> Result<Vec<Entry>> {
        let req = CallRequest {
            data: GuestbookCall::GetEntries.encode(),
        };
        let resp = self.http.post(self.url("/call")).json(&req).send().await?;
        let body: CallResponse = check(resp).await?.json().await?;
        Ok(decode_entries(&body.result)?)
    }

    /// Most recent entry first.
    pub async fn entries_newest_first(&self) -> Result<Vec<Entry>> {
        let mut entries = self.entries().await?;
        entries.reverse();
        Ok(entries)
    }

    /// Sign and submit `signGuestbook(display_name, message)` with `value`
    /// attached. Returns as soon as the node has queued the transaction.
    pub async fn sign(
        &self,
        wallet: &Wallet,
        display_name: &str,
        message: &str,
        value: Wei,
    ) -> Result<TxHash> {
        if let Some(limit) = self.message_limit {
            let len = message.chars().count();
            if len > limit {
                return Err(ClientError::MessageTooLong { len, limit });
            }
        }

        let chain_id = self.info().await?.chain_id;
        let nonce = self.account(&wallet.address()).await?.nonce;

        let call = GuestbookCall::SignGuestbook {
            display_name: display_name.to_string(),
            message: message.to_string(),
        };
        let data = call.encode();
        let estimate = required_gas(&data, &call);
        let gas_limit = estimate + estimate * GAS_HEADROOM_PERCENT / 100;

        let tx = Transaction {
            from: wallet.address(),
            nonce,
            gas_limit,
            value,
            data,
        };
        let signature = signature_to_hex(&wallet.sign_transaction(&tx, chain_id)?);

        let req = SignGuestbookRequest {
            from: tx.from,
            display_name: display_name.to_string(),
            message: message.to_string(),
            value,
            nonce,
            gas_limit,
            signature,
        };
        let resp = self.http.post(self.url("/guestbook/sign")).json(&req).send().await?;
        let body: SubmitResponse = check(resp).await?.json().await?;
        debug!("Submitted {} (nonce {}, gas {})", body.tx_hash, nonce, gas_limit);
        Ok(body.tx_hash)
    }

    /// `None` when the node has never seen the hash.
    pub async fn receipt(&self, hash: &TxHash) -> Result<Option<Receipt>> {
        let resp = self
            .http
            .get(self.url(&format!("/transactions/{}", hash)))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(resp).await?.json().await?))
    }

    /// Poll until the transaction is mined. Giving up (`timeout`) does not
    /// cancel the transaction; it may still land afterwards.
    pub async fn wait_for_receipt(
        &self,
        hash: &TxHash,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<Receipt> {
        let poll = self.poll_receipt(hash, poll_interval);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, poll)
                .await
                .map_err(|_| ClientError::Timeout(*hash))?,
            None => poll.await,
        }
    }

    async fn poll_receipt(&self, hash: &TxHash, poll_interval: Duration) -> Result<Receipt> {
        loop {
            if let Some(receipt) = self.receipt(hash).await? {
                if receipt.status != TxStatus::Pending {
                    return Ok(receipt);
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = error_message(&text).unwrap_or(text);
    Err(ClientError::Node { status, message })
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorResponse>(body).ok().map(|e| e.error)
}
