use std::collections::HashMap;

use super::Transaction;
use crate::blockchain::Block;

/// In-memory queue of transactions awaiting block inclusion, keyed by id.
#[derive(Debug, Default)]
pub struct TransactionPool {
    map: HashMap<String, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn set_transaction(&mut self, transaction: Transaction) {
        self.map
            .insert(transaction.id().to_string(), transaction);
    }

    pub fn remove(&mut self, id: &str) -> Option<Transaction> {
        self.map.remove(id)
    }

    /// The pooled transaction conducted by `input_address`, if any. Used to
    /// supersede a sender's earlier in-flight transfer.
    pub fn existing_transaction(&self, input_address: &str) -> Option<&Transaction> {
        self.map
            .values()
            .find(|tx| tx.input_address() == input_address)
    }

    /// Transactions that currently pass verification, in a deterministic
    /// order, ready for block inclusion.
    pub fn valid_transactions(&self) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self
            .map
            .values()
            .filter(|tx| tx.verify().is_ok())
            .cloned()
            .collect();
        txs.sort_by(|a, b| a.id().cmp(b.id()));
        txs
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self.map.values().cloned().collect();
        txs.sort_by(|a, b| a.id().cmp(b.id()));
        txs
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Drop transactions an adopted chain has already recorded.
    pub fn clear_blockchain_transactions(&mut self, chain: &[Block]) {
        for block in chain.iter().skip(1) {
            for transaction in &block.data {
                self.map.remove(transaction.id());
            }
        }
    }
}
