use std::fs;

use powchain_core::{pow, Block, Transaction};
use powchain_storage::SledStore;
use tempfile::{tempdir, TempDir};

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (
        temp_dir,
        SledStore::open(&db_path).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

/// Proofs solving the puzzle in sequence from the genesis proof.
pub const PROOFS: [u64; 6] = [8862, 153022, 175440, 68443, 107179, 15240];

/// A valid chain of `length` blocks, each carrying one transaction.
pub fn valid_chain(length: usize) -> Vec<Block> {
    let mut chain = vec![powchain_core::genesis_block()];
    for (i, proof) in PROOFS.iter().take(length - 1).enumerate() {
        let prior = chain.last().unwrap();
        assert!(pow::validate(prior.proof, *proof));
        let txs = vec![Transaction::new(format!("user{i}"), "bob", i as f64)];
        chain.push(Block::new(prior.index + 1, txs, *proof, prior.hash()));
    }
    chain
}
