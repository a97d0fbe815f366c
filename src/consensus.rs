//! Longest-valid-chain consensus
//!
//! Peers are fetched concurrently (bounded by a semaphore, each fetch under
//! its own timeout). A peer that errors, times out or serves a chain that
//! fails validation contributes nothing. The winner is the longest valid
//! chain strictly longer than the local one; among equal lengths the peer
//! that comes first in registry order wins.

use crate::blockchain::{validate_chain, Block};
use crate::error::ChainError;
use crate::miner::Difficulty;
use crate::network::ChainSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct ConsensusSettings {
    pub difficulty: Difficulty,
    pub peer_timeout: Duration,
    pub max_concurrent_fetches: usize,
}

/// What a single peer contributed to a round.
#[derive(Debug)]
pub struct PeerOutcome {
    pub peer: String,
    pub result: Result<Vec<Block>, ChainError>,
}

async fn fetch_and_validate(
    source: Arc<dyn ChainSource>,
    peer: String,
    settings: ConsensusSettings,
) -> Result<Vec<Block>, ChainError> {
    let response = tokio::time::timeout(settings.peer_timeout, source.fetch_chain(&peer))
        .await
        .map_err(|_| ChainError::PeerTimeout(peer.clone()))??;

    // Re-hashing a long chain is CPU work; keep it off the runtime workers.
    let difficulty = settings.difficulty;
    tokio::task::spawn_blocking(move || validate_chain(&response.chain, difficulty).map(|()| response.chain))
        .await
        .map_err(|e| ChainError::InvalidPeerResponse(format!("{}: validation task failed: {}", peer, e)))?
}

/// Fetch and validate every peer's chain. Outcomes come back in `peers` order.
pub async fn collect_peer_chains(
    source: Arc<dyn ChainSource>,
    peers: Vec<String>,
    settings: ConsensusSettings,
) -> Vec<PeerOutcome> {
    let permits = Arc::new(Semaphore::new(settings.max_concurrent_fetches.max(1)));
    let mut tasks = JoinSet::new();

    for (position, peer) in peers.iter().cloned().enumerate() {
        let source = source.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => fetch_and_validate(source, peer.clone(), settings).await,
                Err(e) => Err(ChainError::NetworkError(e.to_string())),
            };
            (position, PeerOutcome { peer, result })
        });
    }

    let mut slots: Vec<Option<PeerOutcome>> = peers.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((position, outcome)) => slots[position] = Some(outcome),
            Err(e) => warn!(error = %e, "consensus.fetch_task_failed"),
        }
    }

    slots.into_iter().flatten().collect()
}

/// Pick the chain to adopt, if any. Strictly longer than `local_length`,
/// longest overall, first in order among ties.
pub fn select_longest(outcomes: Vec<PeerOutcome>, local_length: usize) -> Option<Vec<Block>> {
    let mut best: Option<Vec<Block>> = None;
    let mut max_length = local_length;

    for outcome in outcomes {
        match outcome.result {
            Ok(chain) => {
                debug!(peer = %outcome.peer, length = chain.len(), "consensus.peer_chain");
                if chain.len() > max_length {
                    max_length = chain.len();
                    best = Some(chain);
                }
            }
            Err(e) => warn!(peer = %outcome.peer, error = %e, "consensus.peer_skipped"),
        }
    }

    best
}

/// One full round: fan out, validate, reduce.
pub async fn resolve_longest_chain(
    source: Arc<dyn ChainSource>,
    peers: Vec<String>,
    local_length: usize,
    settings: ConsensusSettings,
) -> Option<Vec<Block>> {
    if peers.is_empty() {
        return None;
    }
    let outcomes = collect_peer_chains(source, peers, settings).await;
    select_longest(outcomes, local_length)
}
