use crate::Database;
use crate::models::{AccountRow, BlockCommit, EntryRow, ReceiptRow};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension};

use guestbook_types::{Account, Address, Block, Entry, Receipt, TxHash, Wei};

pub use guestbook_types::api::SortOrder;

impl Database {
    // -- Blocks --

    /// Persist a sealed block atomically. Entries are insert-only; the schema
    /// refuses updates and deletes on them.
    pub fn commit_block(&self, commit: &BlockCommit<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            tx.execute(
                "INSERT INTO blocks (number, timestamp, tx_count) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    commit.block.number as i64,
                    commit.block.timestamp as i64,
                    commit.block.transactions.len() as i64,
                ],
            )?;

            for (idx, entry, tx_hash) in commit.entries {
                tx.execute(
                    "INSERT INTO entries (idx, author, display_name, message, timestamp, has_tipped, tx_hash, block_number)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        *idx as i64,
                        entry.author.to_string(),
                        entry.display_name,
                        entry.message,
                        entry.timestamp as i64,
                        entry.has_tipped,
                        tx_hash.to_string(),
                        commit.block.number as i64,
                    ],
                )?;
            }

            for (address, account) in commit.accounts {
                tx.execute(
                    "INSERT INTO accounts (address, balance, nonce) VALUES (?1, ?2, ?3)
                     ON CONFLICT(address) DO UPDATE SET balance = excluded.balance, nonce = excluded.nonce",
                    rusqlite::params![
                        address.to_string(),
                        account.balance.to_string(),
                        account.nonce as i64,
                    ],
                )?;
            }

            tx.execute(
                "UPDATE contract SET balance = ?1 WHERE id = 1",
                [commit.contract_balance.to_string()],
            )?;

            for (position, receipt) in commit.receipts.iter().enumerate() {
                tx.execute(
                    "INSERT INTO transactions (hash, sender, status, revert_reason, block_number, position, entry_index, gas_used)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        receipt.tx_hash.to_string(),
                        receipt.from.to_string(),
                        receipt.status.as_str(),
                        receipt.revert_reason,
                        receipt.block_number.map(|n| n as i64),
                        position as i64,
                        receipt.entry_index.map(|i| i as i64),
                        receipt.gas_used as i64,
                    ],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    pub fn latest_block(&self) -> Result<Option<Block>> {
        self.with_conn(query_latest_block)
    }

    // -- Entries --

    /// Full ledger in insertion order.
    pub fn load_entries(&self) -> Result<Vec<Entry>> {
        let rows = self.with_conn(|conn| query_entries(conn, 0, -1, SortOrder::Asc))?;
        rows.into_iter()
            .map(|row| row.into_entry().map(|(_, entry)| entry))
            .collect()
    }

    /// Windowed read. `offset` counts from the oldest entry for `Asc` and from
    /// the newest for `Desc`; `limit: None` reads to the end. An offset past
    /// anything SQLite can index yields an empty window.
    pub fn entries_window(
        &self,
        offset: u64,
        limit: Option<u32>,
        order: SortOrder,
    ) -> Result<Vec<(u64, Entry)>> {
        let Ok(offset) = i64::try_from(offset) else {
            return Ok(Vec::new());
        };
        let limit = limit.map(i64::from).unwrap_or(-1);
        let rows = self.with_conn(|conn| query_entries(conn, offset, limit, order))?;
        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    pub fn entry_count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))?;
            Ok(count as u64)
        })
    }

    // -- Accounts --

    pub fn load_accounts(&self) -> Result<Vec<(Address, Account)>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT address, balance, nonce FROM accounts")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AccountRow {
                        address: row.get(0)?,
                        balance: row.get(1)?,
                        nonce: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        rows.into_iter().map(AccountRow::into_account).collect()
    }

    pub fn contract_balance(&self) -> Result<Wei> {
        let balance: String = self.with_conn(|conn| {
            conn.query_row("SELECT balance FROM contract WHERE id = 1", [], |r| r.get(0))
                .map_err(Into::into)
        })?;
        balance
            .parse()
            .map_err(|e| anyhow!("Corrupt contract balance '{}': {}", balance, e))
    }

    // -- Receipts --

    pub fn receipt(&self, hash: &TxHash) -> Result<Option<Receipt>> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT hash, sender, status, revert_reason, block_number, entry_index, gas_used
                 FROM transactions WHERE hash = ?1",
                [hash.to_string()],
                map_receipt_row,
            )
            .optional()
            .map_err(Into::into)
        })?;
        row.map(ReceiptRow::into_receipt).transpose()
    }

    /// Newest first, reverts included.
    pub fn recent_receipts(&self, limit: u32) -> Result<Vec<Receipt>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT hash, sender, status, revert_reason, block_number, entry_index, gas_used
                 FROM transactions
                 ORDER BY block_number DESC, position DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], map_receipt_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        rows.into_iter().map(ReceiptRow::into_receipt).collect()
    }

    pub fn contains_transaction(&self, hash: &TxHash) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM transactions WHERE hash = ?1",
                    [hash.to_string()],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        idx: row.get(0)?,
        author: row.get(1)?,
        display_name: row.get(2)?,
        message: row.get(3)?,
        timestamp: row.get(4)?,
        has_tipped: row.get(5)?,
    })
}

fn map_receipt_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReceiptRow> {
    Ok(ReceiptRow {
        hash: row.get(0)?,
        sender: row.get(1)?,
        status: row.get(2)?,
        revert_reason: row.get(3)?,
        block_number: row.get(4)?,
        entry_index: row.get(5)?,
        gas_used: row.get(6)?,
    })
}

fn query_entries(
    conn: &Connection,
    offset: i64,
    limit: i64,
    order: SortOrder,
) -> Result<Vec<EntryRow>> {
    let sql = match order {
        SortOrder::Asc => {
            "SELECT idx, author, display_name, message, timestamp, has_tipped
             FROM entries ORDER BY idx ASC LIMIT ?1 OFFSET ?2"
        }
        SortOrder::Desc => {
            "SELECT idx, author, display_name, message, timestamp, has_tipped
             FROM entries ORDER BY idx DESC LIMIT ?1 OFFSET ?2"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(rusqlite::params![limit, offset], map_entry_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_latest_block(conn: &Connection) -> Result<Option<Block>> {
    let header: Option<(i64, i64)> = conn
        .query_row(
            "SELECT number, timestamp FROM blocks ORDER BY number DESC LIMIT 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    let Some((number, timestamp)) = header else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare("SELECT hash FROM transactions WHERE block_number = ?1 ORDER BY position ASC")?;
    let transactions = stmt
        .query_map([number], |r| r.get::<_, String>(0))?
        .map(|hash| {
            let hash = hash?;
            hash.parse::<TxHash>()
                .map_err(|e| anyhow!("Corrupt transaction hash '{}': {}", hash, e))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(Block {
        number: number as u64,
        timestamp: timestamp as u64,
        transactions,
    }))
}
