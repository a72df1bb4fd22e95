use serde::{Deserialize, Serialize};

use crate::models::{Address, Entry, Receipt, TxHash, Wei, wei_string};
use crate::tx::hex_bytes;

// -- JWT Claims --

/// Admin session claims issued by `/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Address,
    pub role: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub address: Address,
    /// 65-byte `r || s || v` signature over the admin login message, hex encoded.
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

// -- Transactions --

/// Raw submission: calldata is supplied already ABI-encoded.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitTransactionRequest {
    pub from: Address,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(with = "wei_string", default)]
    pub value: Wei,
    pub nonce: u64,
    pub gas_limit: u64,
    pub signature: String,
}

/// Convenience submission of `signGuestbook(displayName, message)`; the node
/// builds the calldata and checks the signature over the resulting transaction.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignGuestbookRequest {
    pub from: Address,
    pub display_name: String,
    pub message: String,
    #[serde(with = "wei_string", default)]
    pub value: Wei,
    pub nonce: u64,
    pub gas_limit: u64,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub tx_hash: TxHash,
}

pub type ReceiptResponse = Receipt;

#[derive(Debug, Deserialize)]
pub struct ReceiptQuery {
    #[serde(default = "default_receipt_limit")]
    pub limit: u32,
}

fn default_receipt_limit() -> u32 {
    50
}

// -- Entries --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Without `offset`/`limit` the full history is returned.
#[derive(Debug, Default, Deserialize)]
pub struct EntriesQuery {
    pub offset: Option<u64>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResponse {
    pub index: u64,
    #[serde(flatten)]
    pub entry: Entry,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub explorer_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntriesResponse {
    pub total: u64,
    pub entries: Vec<EntryResponse>,
}

// -- Contract calls --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallRequest {
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallResponse {
    #[serde(with = "hex_bytes")]
    pub result: Vec<u8>,
}

// -- Ledger info --

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    #[serde(with = "wei_string")]
    pub balance: Wei,
    pub nonce: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerInfoResponse {
    pub chain_id: u64,
    pub contract_address: Address,
    pub entry_count: u64,
    #[serde(with = "wei_string")]
    pub contract_balance: Wei,
    pub block_number: u64,
    pub pending_transactions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
