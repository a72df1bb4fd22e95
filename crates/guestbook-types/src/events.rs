use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Entry, TxHash};

/// Events pushed over the live feed WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedEvent {
    /// Sent once per connection, before any other event
    Ready {
        connection_id: Uuid,
        entry_count: u64,
        block_number: u64,
    },

    /// A `signGuestbook` transaction landed
    EntryAppended { index: u64, entry: Entry },

    /// A mined transaction reverted; the ledger is unchanged
    TransactionReverted { tx_hash: TxHash, reason: String },

    /// A block was sealed
    BlockMined {
        number: u64,
        timestamp: u64,
        transaction_count: usize,
    },
}

/// Commands sent FROM client TO server over the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedCommand {
    /// Replay persisted entries starting at `from_index`, in ledger order.
    Backfill { from_index: u64 },
}
