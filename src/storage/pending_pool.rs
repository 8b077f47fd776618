use crate::core::Transaction;
use crate::utils::Hash;
use std::collections::HashSet;

/// Applied transactions waiting to be sealed into the next block.
///
/// Keeps arrival order, which is the order they are laid out in the block,
/// plus a hash index so sealed transactions can be dropped quickly when a
/// peer's block arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPool {
    transactions: Vec<Transaction>,
    hashes: HashSet<Hash>,
    capacity: usize,
}

impl PendingPool {
    pub fn new(capacity: usize) -> PendingPool {
        PendingPool {
            transactions: Vec::with_capacity(capacity.min(1024)),
            hashes: HashSet::new(),
            capacity,
        }
    }

    pub fn add(&mut self, tx: Transaction, hash: Hash) {
        self.hashes.insert(hash);
        self.transactions.push(tx);
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.hashes.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.transactions.len() >= self.capacity
    }

    pub fn get_all(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
        self.hashes.clear();
    }

    /// Drop every transaction whose hash is in `sealed`
    pub fn remove_sealed(&mut self, sealed: &HashSet<Hash>) {
        if sealed.is_empty() {
            return;
        }
        self.transactions.retain(|tx| !sealed.contains(&tx.hash()));
        self.hashes.retain(|hash| !sealed.contains(hash));
    }
}
