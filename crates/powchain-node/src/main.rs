mod constants;
mod error;
mod peer_client;
mod routes;
mod state;

use anyhow::Context;
use clap::Parser;
use powchain_core::{constants::DEFAULT_PEER_TIMEOUT_MS, ChainStore, Ledger, PeerRegistry};
use powchain_storage::SledStore;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn, Level};

use crate::{
    constants::{DEFAULT_LISTEN, NODE_ID_BYTES},
    state::AppState,
};

#[derive(Parser, Debug)]
#[command(name = "powchain-node")]
#[command(about = "Proof-of-work ledger node")]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Data directory for sled; the chain lives in memory only when omitted
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Identifier credited with mining rewards; random when omitted
    #[arg(long)]
    node_id: Option<String>,

    /// Peer to register at start-up (repeatable), e.g. http://127.0.0.1:5001
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Per-peer timeout when fetching chains, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PEER_TIMEOUT_MS)]
    peer_timeout_ms: u64,

    /// Run conflict resolution in the background every N seconds
    #[arg(long)]
    resolve_interval_secs: Option<u64>,

    /// Search proofs on all cores
    #[arg(long)]
    parallel_pow: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let store = match &args.data_dir {
        Some(dir) => Some(Arc::new(SledStore::open(dir)?)),
        None => None,
    };
    let ledger = match &store {
        Some(store) => Ledger::with_store(store.clone()).context("restoring chain")?,
        None => Ledger::new(),
    };

    let mut peers = PeerRegistry::new();
    for peer in &args.peers {
        peers.register(peer)?;
    }

    let node_id = args
        .node_id
        .clone()
        .unwrap_or_else(|| hex::encode(rand::random::<[u8; NODE_ID_BYTES]>()));
    let state = AppState::new(
        ledger,
        peers,
        Duration::from_millis(args.peer_timeout_ms),
        node_id.as_str(),
        args.parallel_pow,
    )?;

    if let Some(secs) = args.resolve_interval_secs {
        tokio::spawn(resolve_periodically(state.clone(), Duration::from_secs(secs.max(1))));
    }

    let addr: SocketAddr = args.listen.parse()?;
    info!(
        node_id = %node_id,
        persistent = store.is_some(),
        peer_timeout_ms = state.resolver.timeout().as_millis() as u64,
        "powchain-node listening on http://{addr}"
    );
    let app = routes::router(state);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = store {
        store.close()?;
    }
    Ok(())
}

async fn resolve_periodically(state: AppState, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // the first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match state.resolve_conflicts().await {
            Ok(resolution) if resolution.replaced => {
                info!(height = resolution.chain.len(), "background resolution replaced chain")
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "background resolution failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
