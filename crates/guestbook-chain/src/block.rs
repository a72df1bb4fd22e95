use guestbook_db::BlockCommit;
use guestbook_types::events::FeedEvent;
use guestbook_types::{Account, Address, Block, Entry, Receipt, TxHash, TxStatus, Wei};

/// A block that has been executed against an overlay but not yet persisted
/// or applied to in-memory state.
#[derive(Debug, Clone)]
pub struct SealedBlock {
    pub block: Block,
    pub entries: Vec<(u64, Entry, TxHash)>,
    /// Final state of every touched account, sorted by address.
    pub accounts: Vec<(Address, Account)>,
    pub contract_balance: Wei,
    pub receipts: Vec<Receipt>,
}

impl SealedBlock {
    pub fn as_commit(&self) -> BlockCommit<'_> {
        BlockCommit {
            block: &self.block,
            entries: &self.entries,
            accounts: &self.accounts,
            contract_balance: self.contract_balance,
            receipts: &self.receipts,
        }
    }

    /// Feed events for a committed block: appended entries and reverts in
    /// block order, then the block itself.
    pub fn events(&self) -> Vec<FeedEvent> {
        let mut events = Vec::with_capacity(self.receipts.len() + 1);
        let mut entries = self.entries.iter();

        for receipt in &self.receipts {
            match receipt.status {
                TxStatus::Success if receipt.entry_index.is_some() => {
                    if let Some((index, entry, _)) = entries.next() {
                        events.push(FeedEvent::EntryAppended {
                            index: *index,
                            entry: entry.clone(),
                        });
                    }
                }
                TxStatus::Reverted => events.push(FeedEvent::TransactionReverted {
                    tx_hash: receipt.tx_hash,
                    reason: receipt.revert_reason.clone().unwrap_or_default(),
                }),
                _ => {}
            }
        }

        events.push(FeedEvent::BlockMined {
            number: self.block.number,
            timestamp: self.block.timestamp,
            transaction_count: self.block.transactions.len(),
        });
        events
    }
}
