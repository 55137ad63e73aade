use std::{sync::Arc, time::Duration};

use parking_lot::{Mutex, RwLock};
use powchain_core::{
    mine::search_parallel, pow, Block, ConsensusResolver, Ledger, LedgerError, PeerRegistry,
    Resolution,
};
use tracing::{debug, info};

use crate::{error::ApiError, peer_client::HttpChainFetcher};

/// Shared node state. Every ledger mutation goes through the one `ledger` mutex.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Mutex<Ledger>>,
    pub peers: Arc<RwLock<PeerRegistry>>,
    pub resolver: ConsensusResolver,
    pub fetcher: HttpChainFetcher,
    pub node_id: Arc<str>,
    pub parallel_pow: bool,
}

impl AppState {
    pub fn new(
        ledger: Ledger,
        peers: PeerRegistry,
        peer_timeout: Duration,
        node_id: impl Into<Arc<str>>,
        parallel_pow: bool,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            ledger: Arc::new(Mutex::new(ledger)),
            peers: Arc::new(RwLock::new(peers)),
            resolver: ConsensusResolver::new(peer_timeout),
            fetcher: HttpChainFetcher::new(peer_timeout)?,
            node_id: node_id.into(),
            parallel_pow,
        })
    }

    /// Searches a proof off the async workers without holding the ledger lock,
    /// then seals it. Searches again if another block landed in the meantime.
    pub async fn mine_next_block(&self) -> Result<Block, ApiError> {
        loop {
            let previous = self.ledger.lock().latest_block()?.proof;
            let parallel = self.parallel_pow;
            let proof = tokio::task::spawn_blocking(move || {
                if parallel {
                    search_parallel(previous)
                } else {
                    pow::search(previous)
                }
            })
            .await?;

            let sealed = self.ledger.lock().seal_block(proof, &self.node_id);
            match sealed {
                Ok(block) => return Ok(block),
                Err(LedgerError::InvalidProof { .. }) => {
                    debug!(previous, proof, "chain moved during search, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Runs consensus against every registered peer and adopts the winner.
    /// `replaced` is false when the local chain grew past the winner meanwhile.
    pub async fn resolve_conflicts(&self) -> Result<Resolution, ApiError> {
        let local = self.ledger.lock().chain().to_vec();
        let peers = self.peers.read().list();
        let resolution = self.resolver.resolve(&local, &peers, &self.fetcher).await;
        if !resolution.replaced {
            return Ok(resolution);
        }

        let mut ledger = self.ledger.lock();
        let replaced = ledger.adopt_chain(resolution.chain)?;
        if !replaced {
            info!("local chain outgrew the peer chain during resolution");
        }
        Ok(Resolution {
            replaced,
            chain: ledger.chain().to_vec(),
        })
    }
}
