use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod consensus;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod mine;
pub mod peers;

pub use consensus::{ChainFetcher, ConsensusResolver, PeerChain, Resolution};
pub use error::{LedgerError, Result};
pub use ledger::{genesis_block, ChainStore, Ledger};
pub use peers::PeerRegistry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Seconds since the unix epoch, sampled once when the block is built.
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            timestamp: unix_timestamp(),
            transactions,
            proof,
            previous_hash: previous_hash.into(),
        }
    }

    /// Compact JSON with lexicographically sorted keys at every level.
    ///
    /// Keys are written in sorted order so the encoding does not depend on
    /// which `Map` implementation serde_json was built with.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let transactions: Vec<serde_json::Value> = self
            .transactions
            .iter()
            .map(|tx| {
                json!({
                    "amount": tx.amount,
                    "recipient": tx.recipient,
                    "sender": tx.sender,
                })
            })
            .collect();
        json!({
            "index": self.index,
            "previous_hash": self.previous_hash,
            "proof": self.proof,
            "timestamp": self.timestamp,
            "transactions": transactions,
        })
        .to_string()
        .into_bytes()
    }

    pub fn hash(&self) -> String {
        hash_block(self)
    }
}

/// Lowercase hex SHA-256 of the block's canonical encoding.
pub fn hash_block(block: &Block) -> String {
    hex::encode(Sha256::digest(block.canonical_bytes()))
}

pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

pub mod pow {
    use crate::constants::POW_PREFIX;
    use sha2::{Digest, Sha256};

    /// True when the hex digest of `sha256("{previous_proof}{candidate}")`
    /// starts with exactly [`POW_PREFIX`].
    pub fn validate(previous_proof: u64, candidate: u64) -> bool {
        let digest = Sha256::digest(format!("{previous_proof}{candidate}").as_bytes());
        hex::encode(&digest[..POW_PREFIX.len() / 2]) == POW_PREFIX
    }

    /// Scan candidates upward from zero and return the first one that validates.
    /// Blocks the calling thread until a proof is found.
    pub fn search(previous_proof: u64) -> u64 {
        let mut candidate = 0u64;
        while !validate(previous_proof, candidate) {
            candidate = candidate.wrapping_add(1);
        }
        candidate
    }
}
