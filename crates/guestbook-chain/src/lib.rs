//! Single-process ledger hosting the guestbook contract.
//!
//! Writes arrive as signed transactions, wait in the [`Mempool`], and are
//! sealed into blocks by the miner. A block is committed to SQLite first and
//! only then applied to the in-memory [`WorldState`], so readers never see
//! state that is not on disk.

pub mod block;
pub mod contract;
pub mod error;
pub mod mempool;
pub mod miner;
pub mod state;
pub mod tx;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use guestbook_db::Database;
use guestbook_feed::Dispatcher;
use guestbook_types::api::LedgerInfoResponse;
use guestbook_types::events::FeedEvent;
use guestbook_types::{
    Account, Address, Block, Entry, Receipt, Transaction, TxHash, TxStatus, WEI_PER_ETH, Wei,
};

pub use block::SealedBlock;
pub use contract::{CallContext, Effect, Guestbook};
pub use error::{Revert, SubmitError};
pub use mempool::Mempool;
pub use miner::run_miner_loop;
pub use state::WorldState;
pub use tx::SignedTransaction;

/// Address the contract is reported under when none is configured.
pub const DEFAULT_CONTRACT_ADDRESS: Address = Address([
    0x5f, 0xbd, 0xb2, 0x31, 0x56, 0x78, 0xaf, 0xec, 0xb3, 0x67, 0xf0, 0x32, 0xd9, 0x3f, 0x64, 0x2f,
    0x64, 0x18, 0x0a, 0xa3,
]);

pub const DEFAULT_CHAIN_ID: u64 = 31337;

/// Storage-failure receipts kept for lookup.
const UNPERSISTED_CAPACITY: usize = 4096;

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub contract_address: Address,
    /// Starting balance of every account not seen before.
    pub genesis_balance: Wei,
    pub mempool_capacity: usize,
    pub block_interval: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            genesis_balance: 10_000 * WEI_PER_ETH,
            mempool_capacity: mempool::DEFAULT_CAPACITY,
            block_interval: Duration::from_millis(2000),
        }
    }
}

/// Handle to the running ledger. Cheap to clone.
#[derive(Clone)]
pub struct Chain {
    inner: Arc<ChainInner>,
}

struct ChainInner {
    config: ChainConfig,
    db: Arc<Database>,
    dispatcher: Dispatcher,
    state: RwLock<WorldState>,
    mempool: Mutex<Mempool>,
    /// Serializes block production.
    mining: Mutex<()>,
    /// Receipts of transactions whose block could not be persisted.
    unpersisted: Mutex<UnpersistedReceipts>,
}

/// Most recent storage-failure receipts, oldest evicted first.
struct UnpersistedReceipts {
    receipts: HashMap<TxHash, Receipt>,
    order: VecDeque<TxHash>,
    capacity: usize,
}

impl UnpersistedReceipts {
    fn new(capacity: usize) -> Self {
        Self {
            receipts: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn insert(&mut self, receipt: Receipt) {
        let hash = receipt.tx_hash;
        if self.receipts.insert(hash, receipt).is_none() {
            self.order.push_back(hash);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.receipts.remove(&oldest);
            }
        }
    }

    fn get(&self, hash: &TxHash) -> Option<&Receipt> {
        self.receipts.get(hash)
    }

    fn remove(&mut self, hash: &TxHash) {
        if self.receipts.remove(hash).is_some() {
            self.order.retain(|h| h != hash);
        }
    }
}

impl Chain {
    /// Rebuild state from the database and start accepting transactions.
    pub async fn open(config: ChainConfig, db: Arc<Database>, dispatcher: Dispatcher) -> Result<Self> {
        let load_db = db.clone();
        let (accounts, entries, balance, head) = tokio::task::spawn_blocking(move || {
            Ok::<_, anyhow::Error>((
                load_db.load_accounts()?,
                load_db.load_entries()?,
                load_db.contract_balance()?,
                load_db.latest_block()?,
            ))
        })
        .await??;

        info!(
            "Ledger restored: {} entries, {} accounts, head block {}",
            entries.len(),
            accounts.len(),
            head.as_ref().map_or(0, |b| b.number)
        );

        let state = WorldState::restore(
            config.genesis_balance,
            accounts,
            entries,
            balance,
            head,
        );

        Ok(Self {
            inner: Arc::new(ChainInner {
                mempool: Mutex::new(Mempool::new(config.mempool_capacity)),
                config,
                db,
                dispatcher,
                state: RwLock::new(state),
                mining: Mutex::new(()),
                unpersisted: Mutex::new(UnpersistedReceipts::new(UNPERSISTED_CAPACITY)),
            }),
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.inner.db
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Verify and queue a transaction. Returns its hash immediately; the
    /// outcome is known once a block containing it has been mined.
    ///
    /// A transaction whose block failed to persist may be submitted again.
    pub async fn submit(&self, tx: Transaction, signature: &str) -> Result<TxHash, SubmitError> {
        let signed = SignedTransaction::verify(tx, signature, self.inner.config.chain_id)?;
        let hash = signed.hash;
        let from = signed.tx.from;
        let nonce = signed.tx.nonce;

        // Held across the lookup: a mined transaction leaves the pool only
        // after its block is on disk, so one of the two checks always sees it.
        let mut mempool = self.inner.mempool.lock().await;
        if mempool.contains(&hash) {
            return Err(SubmitError::Duplicate);
        }
        let db = self.inner.db.clone();
        let known = tokio::task::spawn_blocking(move || db.contains_transaction(&hash))
            .await
            .map_err(anyhow::Error::from)??;
        if known {
            return Err(SubmitError::Duplicate);
        }
        mempool.insert(signed)?;
        drop(mempool);

        self.inner.unpersisted.lock().await.remove(&hash);
        info!("Queued transaction {} from {} (nonce {})", hash, from, nonce);
        Ok(hash)
    }

    /// Pending pool first, then persisted receipts, then storage failures.
    pub async fn receipt(&self, hash: &TxHash) -> Result<Option<Receipt>> {
        if let Some(pending) = self.inner.mempool.lock().await.get(hash) {
            return Ok(Some(Receipt::pending(pending.hash, pending.tx.from)));
        }
        let db = self.inner.db.clone();
        let lookup = *hash;
        if let Some(receipt) = tokio::task::spawn_blocking(move || db.receipt(&lookup)).await?? {
            return Ok(Some(receipt));
        }
        Ok(self.inner.unpersisted.lock().await.get(hash).cloned())
    }

    /// Read-only contract call against the latest committed state.
    pub async fn call(&self, data: &[u8]) -> Result<Vec<u8>, Revert> {
        self.inner.state.read().await.guestbook().call(data)
    }

    /// Committed balance, with the nonce advanced past the sender's queued
    /// transactions so back-to-back submissions line up.
    pub async fn account(&self, address: &Address) -> Account {
        let mut account = self.inner.state.read().await.account(address);
        let mempool = self.inner.mempool.lock().await;
        for pending in mempool.from_sender(address) {
            if pending.tx.nonce == account.nonce {
                account.nonce += 1;
            }
        }
        account
    }

    /// `getEntries()`: the whole history in insertion order.
    pub async fn entries(&self) -> Vec<Entry> {
        self.inner.state.read().await.guestbook().get_entries().to_vec()
    }

    pub async fn entry(&self, index: u64) -> Option<Entry> {
        self.inner.state.read().await.guestbook().entry(index).cloned()
    }

    pub async fn entry_count(&self) -> u64 {
        self.inner.state.read().await.guestbook().len()
    }

    pub async fn info(&self) -> LedgerInfoResponse {
        let (entry_count, contract_balance, block_number) = {
            let state = self.inner.state.read().await;
            (state.guestbook().len(), state.guestbook().balance(), state.block_number())
        };
        LedgerInfoResponse {
            chain_id: self.inner.config.chain_id,
            contract_address: self.inner.config.contract_address,
            entry_count,
            contract_balance,
            block_number,
            pending_transactions: self.inner.mempool.lock().await.len(),
        }
    }

    pub async fn mine_block(&self) -> Result<Option<Block>> {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        self.mine_block_at(now).await
    }

    /// Seal everything pending into one block stamped `now` (or the previous
    /// block time, if later). Returns `None` when the pool is empty.
    pub async fn mine_block_at(&self, now: u64) -> Result<Option<Block>> {
        let _guard = self.inner.mining.lock().await;

        let pending = self.inner.mempool.lock().await.snapshot();
        if pending.is_empty() {
            return Ok(None);
        }

        // Anything already on disk would collide with its stored receipt.
        let db = self.inner.db.clone();
        let (pending, persisted) = tokio::task::spawn_blocking(move || {
            let mut persisted = HashSet::new();
            for signed in &pending {
                if db.contains_transaction(&signed.hash)? {
                    persisted.insert(signed.hash);
                }
            }
            Ok::<_, anyhow::Error>((pending, persisted))
        })
        .await??;

        let taken = pending.len();
        let txs: Vec<SignedTransaction> = pending
            .into_iter()
            .filter(|signed| !persisted.contains(&signed.hash))
            .collect();
        if txs.is_empty() {
            self.inner.mempool.lock().await.discard(taken);
            return Ok(None);
        }
        if !persisted.is_empty() {
            warn!("Dropped {} already-mined transactions from the pool", persisted.len());
        }

        let sealed = self.inner.state.read().await.build_block(&txs, now);

        let db = self.inner.db.clone();
        let (sealed, committed) = tokio::task::spawn_blocking(move || {
            let committed = db.commit_block(&sealed.as_commit());
            (sealed, committed)
        })
        .await?;

        if let Err(e) = committed {
            warn!("Failed to persist block {}: {}", sealed.block.number, e);
            self.record_unpersisted(&txs).await;
            self.inner.mempool.lock().await.discard(taken);
            return Err(e);
        }

        self.inner.state.write().await.apply(&sealed);
        self.inner.mempool.lock().await.discard(taken);

        for event in sealed.events() {
            self.inner.dispatcher.broadcast(event);
        }
        Ok(Some(sealed.block))
    }

    async fn record_unpersisted(&self, txs: &[SignedTransaction]) {
        let reason = Revert::StorageFailure.to_string();
        let mut unpersisted = self.inner.unpersisted.lock().await;
        for signed in txs {
            let mut receipt = Receipt::pending(signed.hash, signed.tx.from);
            receipt.status = TxStatus::Reverted;
            receipt.revert_reason = Some(reason.clone());
            unpersisted.insert(receipt);

            self.inner.dispatcher.broadcast(FeedEvent::TransactionReverted {
                tx_hash: signed.hash,
                reason: reason.clone(),
            });
        }
    }
}
