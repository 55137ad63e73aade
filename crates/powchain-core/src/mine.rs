use crate::pow::validate;
use rayon::prelude::*;
use tracing::debug;

/// Candidates handed to the thread pool per round.
const CANDIDATES_PER_ROUND: u64 = 1 << 16;

/// Searches proofs in parallel, one round of candidates at a time.
/// `find_first` keeps the lowest hit of a round, so the result matches [`crate::pow::search`].
pub fn search_parallel(previous_proof: u64) -> u64 {
    let mut start = 0u64;
    loop {
        let end = start.saturating_add(CANDIDATES_PER_ROUND);
        if let Some(proof) = (start..end)
            .into_par_iter()
            .find_first(|candidate| validate(previous_proof, *candidate))
        {
            debug!(previous_proof, proof, "found proof");
            return proof;
        }
        // wraps only after the whole u64 space was scanned
        start = if end == u64::MAX { 0 } else { end };
    }
}
