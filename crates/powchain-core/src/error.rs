use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    #[error("invalid chain: {0}")]
    InvalidChain(String),

    #[error("proof {proof} does not solve the puzzle for previous proof {previous}")]
    InvalidProof { previous: u64, proof: u64 },

    /// The chain lost its genesis block. Only a construction bug can get here.
    #[error("chain is empty")]
    EmptyChain,

    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
