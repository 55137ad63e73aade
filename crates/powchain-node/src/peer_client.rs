use std::time::Duration;

use anyhow::Context;
use powchain_core::{ChainFetcher, LedgerError, PeerChain};
use reqwest::Client;

use crate::constants::FULLCHAIN_PATH;

/// Fetches peer chains over plain HTTP.
#[derive(Clone, Debug)]
pub struct HttpChainFetcher {
    client: Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building peer HTTP client")?;
        Ok(Self { client })
    }
}

impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> powchain_core::Result<PeerChain> {
        let unreachable = |reason: String| LedgerError::PeerUnreachable {
            peer: peer.to_string(),
            reason,
        };

        let response = self
            .client
            .get(format!("http://{peer}{FULLCHAIN_PATH}"))
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unreachable(format!("status {}", response.status())));
        }
        response
            .json::<PeerChain>()
            .await
            .map_err(|e| unreachable(format!("malformed chain payload: {e}")))
    }
}
