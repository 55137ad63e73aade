use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use powchain_core::{peers::network_location, PeerChain, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::{constants::FULLCHAIN_PATH, error::ApiError, state::AppState};

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
struct NewTransaction {
    sender: String,
    recipient: String,
    amount: f64,
}

#[derive(Deserialize)]
struct RegisterNodes {
    #[serde(default)]
    nodes: Vec<String>,
}

#[derive(Serialize)]
struct MinedBlock {
    message: &'static str,
    index: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

#[derive(Serialize)]
struct Resolved {
    message: &'static str,
    replaced: bool,
    chain: Vec<powchain_core::Block>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/mining", get(mine))
        .route("/transactions/add", post(add_transaction))
        .route("/transactions/pending", get(pending_transactions))
        .route(FULLCHAIN_PATH, get(full_chain))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/conflict_resolving", get(resolve_conflicts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn mine(State(state): State<AppState>) -> Result<Json<MinedBlock>, ApiError> {
    let block = state.mine_next_block().await?;
    Ok(Json(MinedBlock {
        message: "New block created",
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

async fn add_transaction(
    State(state): State<AppState>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(tx) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let index = state
        .ledger
        .lock()
        .queue_transaction(tx.sender, tx.recipient, tx.amount);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Transaction will be added to block {index}"),
            "index": index,
        })),
    ))
}

async fn pending_transactions(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.ledger.lock().pending().to_vec())
}

async fn full_chain(State(state): State<AppState>) -> Json<PeerChain> {
    Json(PeerChain::new(state.ledger.lock().chain().to_vec()))
}

async fn register_nodes(
    State(state): State<AppState>,
    payload: Result<Json<RegisterNodes>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    if body.nodes.is_empty() {
        return Err(ApiError::validation("list of nodes is empty"));
    }
    // parse everything first so a bad entry registers nothing
    let locations = body
        .nodes
        .iter()
        .map(|node| network_location(node))
        .collect::<Result<Vec<_>, _>>()?;

    let mut peers = state.peers.write();
    for location in &locations {
        peers.register(location)?;
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "New nodes have been added",
            "total_nodes": peers.list(),
        })),
    ))
}

async fn resolve_conflicts(State(state): State<AppState>) -> Result<Json<Resolved>, ApiError> {
    let resolution = state.resolve_conflicts().await?;
    let message = if resolution.replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    Ok(Json(Resolved {
        message,
        replaced: resolution.replaced,
        chain: resolution.chain,
    }))
}
