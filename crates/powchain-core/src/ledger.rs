use std::sync::Arc;
use tracing::info;

use crate::{
    constants::{GENESIS_INDEX, GENESIS_PREVIOUS_HASH, GENESIS_PROOF, REWARD_AMOUNT, REWARD_SENDER},
    error::{LedgerError, Result},
    pow, Block, Transaction,
};

/// Trait the storage backends implement for the ledger to persist its chain.
/// This lives in `powchain-core` to avoid a circular dependency.
pub trait ChainStore: Send + Sync {
    fn put_block(&self, block: &Block) -> anyhow::Result<()>;
    /// Index of the last stored block, 0 when the store is empty.
    fn tip_height(&self) -> anyhow::Result<u64>;
    fn load_chain(&self) -> anyhow::Result<Vec<Block>>;
    fn replace_chain(&self, chain: &[Block]) -> anyhow::Result<()>;
    fn close(&self) -> anyhow::Result<()>;
}

/// The block chain plus the pool of transactions waiting for the next block.
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    store: Option<Arc<dyn ChainStore>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// A fresh in-memory ledger holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![genesis_block()],
            pending: Vec::new(),
            store: None,
        }
    }

    /// Restores the chain held by `store`, or seeds an empty store with a genesis block.
    pub fn with_store(store: Arc<dyn ChainStore>) -> Result<Self> {
        let stored = store.load_chain().map_err(LedgerError::Storage)?;
        let tip = store.tip_height().map_err(LedgerError::Storage)?;
        let last = stored.last().map_or(0, |b| b.index);
        if tip != last {
            return Err(LedgerError::InvalidChain(format!(
                "store tip height {tip} does not match last stored block {last}"
            )));
        }
        let chain = if stored.is_empty() {
            let genesis = genesis_block();
            store.put_block(&genesis).map_err(LedgerError::Storage)?;
            vec![genesis]
        } else if Self::is_chain_valid(&stored) {
            info!(height = stored.len(), "restored chain from store");
            stored
        } else {
            return Err(LedgerError::InvalidChain(format!(
                "stored chain of {} blocks failed validation",
                stored.len()
            )));
        };
        Ok(Self {
            chain,
            pending: Vec::new(),
            store: Some(store),
        })
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn latest_block(&self) -> Result<&Block> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }

    /// Queues a transaction and returns the index of the block that will hold it.
    pub fn queue_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> u64 {
        self.pending
            .push(Transaction::new(sender, recipient, amount));
        self.next_index()
    }

    /// Seals every pending transaction into a new block on top of the chain.
    ///
    /// `previous_hash` defaults to the hash of the latest block. The proof is
    /// taken as given; use [`Ledger::seal_block`] to have it checked first.
    /// The pending pool is emptied even when persisting the block fails.
    pub fn mine_block(&mut self, proof: u64, previous_hash: Option<String>) -> Result<Block> {
        let transactions = std::mem::take(&mut self.pending);
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.latest_block()?.hash(),
        };
        let block = Block::new(self.next_index(), transactions, proof, previous_hash);

        if let Some(store) = &self.store {
            store.put_block(&block).map_err(LedgerError::Storage)?;
        }
        info!(
            index = block.index,
            proof,
            txs = block.transactions.len(),
            "mined block"
        );
        self.chain.push(block.clone());
        Ok(block)
    }

    /// Checks `proof` against the latest block, rewards `miner` and mines the block.
    ///
    /// Returns [`LedgerError::InvalidProof`] without touching the pool when the
    /// proof does not solve the puzzle, e.g. because the chain moved on while
    /// the caller was searching.
    pub fn seal_block(&mut self, proof: u64, miner: &str) -> Result<Block> {
        let previous = self.latest_block()?.proof;
        if !pow::validate(previous, proof) {
            return Err(LedgerError::InvalidProof { previous, proof });
        }
        self.queue_transaction(REWARD_SENDER, miner, REWARD_AMOUNT);
        self.mine_block(proof, None)
    }

    /// Replaces the chain with `candidate` if it is strictly longer and valid.
    pub fn adopt_chain(&mut self, candidate: Vec<Block>) -> Result<bool> {
        if candidate.len() <= self.chain.len() {
            return Ok(false);
        }
        if !Self::is_chain_valid(&candidate) {
            return Err(LedgerError::InvalidChain(format!(
                "candidate of {} blocks failed validation",
                candidate.len()
            )));
        }
        if let Some(store) = &self.store {
            store
                .replace_chain(&candidate)
                .map_err(LedgerError::Storage)?;
        }
        info!(
            old_height = self.chain.len(),
            new_height = candidate.len(),
            "replaced local chain"
        );
        self.chain = candidate;
        Ok(true)
    }

    /// Walks `chain` and checks every block links to its predecessor by hash,
    /// proof and index. The first block is trusted as given.
    pub fn is_chain_valid(chain: &[Block]) -> bool {
        if chain.is_empty() {
            return false;
        }
        chain.windows(2).all(|pair| {
            let (prior, block) = (&pair[0], &pair[1]);
            block.previous_hash == prior.hash()
                && pow::validate(prior.proof, block.proof)
                && prior.index.checked_add(1) == Some(block.index)
        })
    }

    fn next_index(&self) -> u64 {
        self.chain.len() as u64 + 1
    }
}

/// A transaction-free genesis block with the sentinel previous hash.
pub fn genesis_block() -> Block {
    Block::new(GENESIS_INDEX, vec![], GENESIS_PROOF, GENESIS_PREVIOUS_HASH)
}
