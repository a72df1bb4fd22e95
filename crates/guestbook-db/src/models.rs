//! Database row types. These map directly to SQLite rows.
//! Addresses, hashes and wei amounts are stored as text and parsed on the way out.

use anyhow::{Context, Result};

use guestbook_types::{Account, Address, Block, Entry, Receipt, TxHash, Wei};

pub struct EntryRow {
    pub idx: i64,
    pub author: String,
    pub display_name: String,
    pub message: String,
    pub timestamp: i64,
    pub has_tipped: bool,
}

impl EntryRow {
    pub fn into_entry(self) -> Result<(u64, Entry)> {
        let author: Address = self
            .author
            .parse()
            .with_context(|| format!("corrupt author '{}' on entry {}", self.author, self.idx))?;
        Ok((
            self.idx as u64,
            Entry {
                author,
                display_name: self.display_name,
                message: self.message,
                timestamp: self.timestamp as u64,
                has_tipped: self.has_tipped,
            },
        ))
    }
}

pub struct AccountRow {
    pub address: String,
    pub balance: String,
    pub nonce: i64,
}

impl AccountRow {
    pub fn into_account(self) -> Result<(Address, Account)> {
        let address: Address = self
            .address
            .parse()
            .with_context(|| format!("corrupt account address '{}'", self.address))?;
        let balance: Wei = self
            .balance
            .parse()
            .with_context(|| format!("corrupt balance '{}' for {}", self.balance, address))?;
        Ok((
            address,
            Account {
                balance,
                nonce: self.nonce as u64,
            },
        ))
    }
}

pub struct ReceiptRow {
    pub hash: String,
    pub sender: String,
    pub status: String,
    pub revert_reason: Option<String>,
    pub block_number: Option<i64>,
    pub entry_index: Option<i64>,
    pub gas_used: i64,
}

impl ReceiptRow {
    pub fn into_receipt(self) -> Result<Receipt> {
        let tx_hash: TxHash = self
            .hash
            .parse()
            .with_context(|| format!("corrupt transaction hash '{}'", self.hash))?;
        Ok(Receipt {
            tx_hash,
            from: self
                .sender
                .parse()
                .with_context(|| format!("corrupt sender on {}", tx_hash))?,
            status: self
                .status
                .parse()
                .map_err(|e: String| anyhow::anyhow!("{} on {}", e, tx_hash))?,
            revert_reason: self.revert_reason,
            block_number: self.block_number.map(|n| n as u64),
            entry_index: self.entry_index.map(|i| i as u64),
            gas_used: self.gas_used as u64,
        })
    }
}

/// Everything one sealed block changes, written in a single SQL transaction.
pub struct BlockCommit<'a> {
    pub block: &'a Block,
    /// New ledger entries with their index and originating transaction.
    pub entries: &'a [(u64, Entry, TxHash)],
    /// Final state of every account the block touched.
    pub accounts: &'a [(Address, Account)],
    pub contract_balance: Wei,
    /// One receipt per transaction in the block, in block order.
    pub receipts: &'a [Receipt],
}
