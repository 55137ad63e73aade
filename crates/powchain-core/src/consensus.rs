//! Longest-valid-chain resolution against a set of peers.
//!
//! The resolver only decides. Applying the winning chain is left to
//! [`crate::Ledger::adopt_chain`], run under whatever lock guards the ledger.

use std::{future::Future, time::Duration};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    constants::DEFAULT_PEER_TIMEOUT_MS,
    error::{LedgerError, Result},
    Block, Ledger,
};

/// Body of a node's `GET /fullchain` response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerChain {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl PeerChain {
    pub fn new(chain: Vec<Block>) -> Self {
        Self {
            length: chain.len(),
            chain,
        }
    }
}

/// Transport used to download a peer's chain.
pub trait ChainFetcher: Send + Sync {
    fn fetch_chain(&self, peer: &str) -> impl Future<Output = Result<PeerChain>> + Send;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub replaced: bool,
    pub chain: Vec<Block>,
}

#[derive(Clone, Debug)]
pub struct ConsensusResolver {
    timeout: Duration,
}

impl Default for ConsensusResolver {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_PEER_TIMEOUT_MS))
    }
}

impl ConsensusResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Queries every peer concurrently and picks the longest valid chain that
    /// beats `local`. Peers that fail, time out or send a bad chain are skipped.
    pub async fn resolve<F: ChainFetcher>(
        &self,
        local: &[Block],
        peers: &[String],
        fetcher: &F,
    ) -> Resolution {
        let results = join_all(peers.iter().map(|peer| self.fetch(fetcher, peer))).await;

        let mut best_length = local.len();
        let mut best: Option<Vec<Block>> = None;
        for (peer, result) in peers.iter().zip(results) {
            let fetched = match result {
                Ok(fetched) => fetched,
                Err(err) => {
                    warn!(peer = %peer, error = %err, "skipping peer");
                    continue;
                }
            };
            if fetched.length <= best_length {
                debug!(peer = %peer, length = fetched.length, best_length, "peer chain not longer");
                continue;
            }
            if !Ledger::is_chain_valid(&fetched.chain) {
                warn!(peer = %peer, length = fetched.length, "rejecting invalid chain");
                continue;
            }
            best_length = fetched.length;
            best = Some(fetched.chain);
        }

        match best {
            Some(chain) => {
                info!(
                    local_length = local.len(),
                    length = chain.len(),
                    "found longer valid chain"
                );
                Resolution {
                    replaced: true,
                    chain,
                }
            }
            None => Resolution {
                replaced: false,
                chain: local.to_vec(),
            },
        }
    }

    async fn fetch<F: ChainFetcher>(&self, fetcher: &F, peer: &str) -> Result<PeerChain> {
        let fetched = match tokio::time::timeout(self.timeout, fetcher.fetch_chain(peer)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(LedgerError::PeerUnreachable {
                    peer: peer.to_string(),
                    reason: format!("no response within {:?}", self.timeout),
                })
            }
        };
        if fetched.length != fetched.chain.len() {
            return Err(LedgerError::PeerUnreachable {
                peer: peer.to_string(),
                reason: format!(
                    "reported length {} but sent {} blocks",
                    fetched.length,
                    fetched.chain.len()
                ),
            });
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const PROOFS: [u64; 4] = [8862, 153022, 175440, 68443];

    fn chain_of(length: usize) -> Vec<Block> {
        let mut ledger = Ledger::new();
        for proof in PROOFS.iter().take(length - 1) {
            ledger.mine_block(*proof, None).unwrap();
        }
        ledger.chain().to_vec()
    }

    enum Reply {
        Chain(PeerChain),
        Down,
        Hang,
    }

    #[derive(Default)]
    struct FakeNet {
        replies: HashMap<String, Reply>,
    }

    impl FakeNet {
        fn with(mut self, peer: &str, reply: Reply) -> Self {
            self.replies.insert(peer.to_string(), reply);
            self
        }
    }

    impl ChainFetcher for FakeNet {
        async fn fetch_chain(&self, peer: &str) -> Result<PeerChain> {
            match self.replies.get(peer) {
                Some(Reply::Chain(chain)) => Ok(chain.clone()),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(LedgerError::PeerUnreachable {
                        peer: peer.to_string(),
                        reason: "hung".into(),
                    })
                }
                Some(Reply::Down) | None => Err(LedgerError::PeerUnreachable {
                    peer: peer.to_string(),
                    reason: "connection refused".into(),
                }),
            }
        }
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn no_peers_keeps_local() {
        let local = chain_of(2);
        let resolution = ConsensusResolver::default()
            .resolve(&local, &[], &FakeNet::default())
            .await;
        assert!(!resolution.replaced);
        assert_eq!(resolution.chain, local);
    }

    #[tokio::test]
    async fn longer_valid_chain_wins() {
        let local = chain_of(3);
        let remote = chain_of(5);
        let net = FakeNet::default().with("a:1", Reply::Chain(PeerChain::new(remote.clone())));
        let resolution = ConsensusResolver::default()
            .resolve(&local, &peers(&["a:1"]), &net)
            .await;
        assert!(resolution.replaced);
        assert_eq!(resolution.chain, remote);
    }

    #[tokio::test]
    async fn longer_invalid_chain_is_rejected() {
        let local = chain_of(3);
        let mut remote = chain_of(5);
        remote[3].previous_hash = "00".repeat(32);
        let net = FakeNet::default().with("a:1", Reply::Chain(PeerChain::new(remote)));
        let resolution = ConsensusResolver::default()
            .resolve(&local, &peers(&["a:1"]), &net)
            .await;
        assert!(!resolution.replaced);
        assert_eq!(resolution.chain.len(), 3);
        assert_eq!(resolution.chain, local);
    }

    #[tokio::test]
    async fn equal_length_does_not_replace() {
        let local = chain_of(3);
        let net = FakeNet::default().with("a:1", Reply::Chain(PeerChain::new(chain_of(3))));
        let resolution = ConsensusResolver::default()
            .resolve(&local, &peers(&["a:1"]), &net)
            .await;
        assert!(!resolution.replaced);
        assert_eq!(resolution.chain, local);
    }

    #[tokio::test]
    async fn longest_of_several_peers_wins() {
        let local = chain_of(2);
        let four = chain_of(4);
        let five = chain_of(5);
        let net = FakeNet::default()
            .with("a:1", Reply::Chain(PeerChain::new(four)))
            .with("b:1", Reply::Chain(PeerChain::new(five.clone())))
            .with("c:1", Reply::Chain(PeerChain::new(chain_of(3))));
        let resolution = ConsensusResolver::default()
            .resolve(&local, &peers(&["a:1", "b:1", "c:1"]), &net)
            .await;
        assert!(resolution.replaced);
        assert_eq!(resolution.chain, five);
    }

    #[tokio::test]
    async fn unreachable_and_slow_peers_are_skipped() {
        let local = chain_of(2);
        let remote = chain_of(4);
        let net = FakeNet::default()
            .with("down:1", Reply::Down)
            .with("slow:1", Reply::Hang)
            .with("good:1", Reply::Chain(PeerChain::new(remote.clone())));
        let resolver = ConsensusResolver::new(Duration::from_millis(50));
        let resolution = resolver
            .resolve(&local, &peers(&["down:1", "slow:1", "good:1"]), &net)
            .await;
        assert!(resolution.replaced);
        assert_eq!(resolution.chain, remote);
    }

    #[tokio::test]
    async fn misreported_length_is_skipped() {
        let local = chain_of(3);
        let mut bogus = PeerChain::new(chain_of(2));
        bogus.length = 10;
        let net = FakeNet::default().with("a:1", Reply::Chain(bogus));
        let resolution = ConsensusResolver::default()
            .resolve(&local, &peers(&["a:1"]), &net)
            .await;
        assert!(!resolution.replaced);
        assert_eq!(resolution.chain, local);
    }
}
