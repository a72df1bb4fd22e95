use std::collections::{HashSet, VecDeque};

use guestbook_types::{Address, TxHash};

use crate::error::SubmitError;
use crate::tx::SignedTransaction;

pub const DEFAULT_CAPACITY: usize = 1024;

/// Pending transactions in submission order.
#[derive(Debug)]
pub struct Mempool {
    queue: VecDeque<SignedTransaction>,
    hashes: HashSet<TxHash>,
    capacity: usize,
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Mempool {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            hashes: HashSet::new(),
            capacity,
        }
    }

    pub fn insert(&mut self, tx: SignedTransaction) -> Result<TxHash, SubmitError> {
        if self.hashes.contains(&tx.hash) {
            return Err(SubmitError::Duplicate);
        }
        if self.queue.len() >= self.capacity {
            return Err(SubmitError::PoolFull(self.capacity));
        }
        let hash = tx.hash;
        self.hashes.insert(hash);
        self.queue.push_back(tx);
        Ok(hash)
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.hashes.contains(hash)
    }

    pub fn get(&self, hash: &TxHash) -> Option<&SignedTransaction> {
        if !self.contains(hash) {
            return None;
        }
        self.queue.iter().find(|tx| tx.hash == *hash)
    }

    /// Copy of everything pending, oldest first. The transactions stay in
    /// the pool (and keep reporting `pending`) until `discard` is called.
    pub fn snapshot(&self) -> Vec<SignedTransaction> {
        self.queue.iter().cloned().collect()
    }

    /// Drop the `count` oldest transactions.
    pub fn discard(&mut self, count: usize) {
        for tx in self.queue.drain(..count.min(self.queue.len())) {
            self.hashes.remove(&tx.hash);
        }
    }

    /// Pending transactions from `sender`, in submission order.
    pub fn from_sender<'a>(
        &'a self,
        sender: &'a Address,
    ) -> impl Iterator<Item = &'a SignedTransaction> + 'a {
        self.queue.iter().filter(move |tx| tx.tx.from == *sender)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
