use crate::crypto::canonical_hash;
use crate::error::ChainError;
use crate::miner::Difficulty;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Proof carried by the genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// Placeholder link stored in the genesis block. Not a digest.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    /// Key-sorted representation used only for hashing.
    pub fn canonical_value(&self) -> Value {
        let transactions: Vec<Value> = self
            .transactions
            .iter()
            .map(Transaction::canonical_value)
            .collect();

        json!({
            "index": self.index,
            "previous_hash": self.previous_hash,
            "proof": self.proof,
            "timestamp": self.timestamp,
            "transactions": transactions,
        })
    }

    /// Hex SHA-256 of the canonical representation.
    pub fn hash(&self) -> String {
        canonical_hash(self.canonical_value())
    }
}

fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// The ledger: sealed blocks plus the pool of transactions waiting for the
/// next block. Sharing across tasks is the caller's job (the node keeps it
/// behind a single `RwLock`).
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    difficulty: Difficulty,
}

impl Blockchain {
    /// Create a ledger seeded with the genesis block.
    pub fn new(difficulty: Difficulty) -> Self {
        let mut blockchain = Blockchain {
            blocks: Vec::new(),
            pending: Vec::new(),
            difficulty,
        };
        blockchain.push_block(GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string());
        blockchain
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn last_block(&self) -> Result<&Block, ChainError> {
        self.blocks.last().ok_or(ChainError::EmptyChain)
    }

    /// Pool a transaction and return the index of the block expected to hold
    /// it. That index is a forecast, not a commit receipt.
    pub fn new_transaction(&mut self, transaction: Transaction) -> Result<u64, ChainError> {
        let next_index = self.last_block()?.index + 1;
        self.pending.push(transaction);
        Ok(next_index)
    }

    /// Seal the whole pending pool into a new block and append it.
    ///
    /// The pool is drained unconditionally: dropping the returned block does
    /// not bring the transactions back.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> Result<Block, ChainError> {
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.last_block()?.hash(),
        };
        Ok(self.push_block(proof, previous_hash))
    }

    fn push_block(&mut self, proof: u64, previous_hash: String) -> Block {
        let block = Block {
            index: self.blocks.len() as u64 + 1,
            timestamp: now_seconds(),
            transactions: std::mem::take(&mut self.pending),
            proof,
            previous_hash,
        };
        self.blocks.push(block.clone());
        block
    }

    /// Search and seal in one call, for building fixture chains in tests.
    #[cfg(test)]
    pub(crate) fn mine(&mut self) -> Result<Block, ChainError> {
        let last_proof = self.last_block()?.proof;
        let proof = crate::miner::proof_of_work(last_proof, self.difficulty);
        self.new_block(proof, None)
    }

    /// Swap in a chain adopted through consensus. The pending pool is kept.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<(), ChainError> {
        if chain.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        self.blocks = chain;
        Ok(())
    }
}
