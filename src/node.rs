//! The node: one ledger, one peer registry, and the operations exposed to
//! whatever transport sits in front of them.
//!
//! The ledger (chain plus pending pool) lives behind a single `RwLock`.
//! Proof-of-work searches and peer fetches run with no lock held; the write
//! lock is only taken to append a sealed block or install an adopted chain.

use crate::blockchain::{records_for_patient, Block, Blockchain, PatientRecord};
use crate::config::Config;
use crate::consensus::{resolve_longest_chain, ConsensusSettings};
use crate::error::ChainError;
use crate::miner::proof_of_work;
use crate::network::{ChainResponse, ChainSource, HttpChainSource, PeerRegistry};
use crate::transaction::Transaction;
use rand::RngCore;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeState {
    Booting,
    Ready,
}

/// Result of a consensus round as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveOutcome {
    pub replaced: bool,
    pub chain: Vec<Block>,
}

#[derive(Debug, Default)]
struct NodeCounters {
    blocks_mined: AtomicU64,
    transactions_submitted: AtomicU64,
    consensus_rounds: AtomicU64,
    chains_replaced: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeStats {
    pub node_id: String,
    pub chain_length: usize,
    pub pending_transactions: usize,
    pub peer_count: usize,
    pub difficulty: usize,
    pub blocks_mined: u64,
    pub transactions_submitted: u64,
    pub consensus_rounds: u64,
    pub chains_replaced: u64,
    pub uptime_seconds: u64,
}

pub struct Node {
    pub config: Config,
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub peers: Arc<RwLock<PeerRegistry>>,
    source: Arc<dyn ChainSource>,
    settings: ConsensusSettings,
    state: RwLock<NodeState>,
    node_id: String,
    counters: NodeCounters,
    started_at: Instant,
}

fn generate_node_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Node {
    /// Build a node that fetches peer chains over http.
    pub fn new(config: Config) -> Result<Self, ChainError> {
        let source = Arc::new(HttpChainSource::new(config.peer_timeout())?);
        Self::with_source(config, source)
    }

    /// Build a node with a custom peer chain source.
    pub fn with_source(config: Config, source: Arc<dyn ChainSource>) -> Result<Self, ChainError> {
        config.validate()?;
        let settings = config.consensus_settings()?;

        let mut peers = PeerRegistry::new();
        for address in &config.network.bootstrap_peers {
            if let Err(e) = peers.register_node(address) {
                warn!("Skipping bootstrap peer {}: {}", address, e);
            }
        }

        let node_id = generate_node_id();
        info!(
            node_id = %node_id,
            difficulty = %settings.difficulty,
            peers = peers.len(),
            "Ledger initialised with genesis block"
        );

        Ok(Self {
            blockchain: Arc::new(RwLock::new(Blockchain::new(settings.difficulty))),
            peers: Arc::new(RwLock::new(peers)),
            source,
            settings,
            state: RwLock::new(NodeState::Booting),
            node_id,
            counters: NodeCounters::default(),
            started_at: Instant::now(),
            config,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub async fn state(&self) -> NodeState {
        *self.state.read().await
    }

    pub async fn set_state(&self, state: NodeState) {
        *self.state.write().await = state;
    }

    /// Search for the next proof and seal the pending pool into a block.
    ///
    /// If another block lands (or consensus swaps the chain) while the search
    /// runs, the found proof no longer chains onto the tip, so the search is
    /// repeated against the new tip.
    pub async fn mine(&self) -> Result<Block, ChainError> {
        let difficulty = self.settings.difficulty;
        loop {
            let (last_proof, tip_hash) = {
                let chain = self.blockchain.read().await;
                let last = chain.last_block()?;
                (last.proof, last.hash())
            };

            let started = Instant::now();
            let proof = tokio::task::spawn_blocking(move || proof_of_work(last_proof, difficulty))
                .await
                .map_err(|e| ChainError::MiningError(e.to_string()))?;

            let mut chain = self.blockchain.write().await;
            let last = chain.last_block()?;
            if last.proof != last_proof || last.hash() != tip_hash {
                debug!(last_proof, "Chain tip moved during proof search, retrying");
                continue;
            }

            let block = chain.new_block(proof, Some(tip_hash))?;
            self.counters.blocks_mined.fetch_add(1, Ordering::Relaxed);
            info!(
                index = block.index,
                proof = block.proof,
                transactions = block.transactions.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "New block forged"
            );
            return Ok(block);
        }
    }

    /// Pool a transaction; returns the prospective block index.
    pub async fn submit_transaction(&self, transaction: Transaction) -> Result<u64, ChainError> {
        let index = self.blockchain.write().await.new_transaction(transaction)?;
        self.counters.transactions_submitted.fetch_add(1, Ordering::Relaxed);
        debug!(index, "Transaction pooled");
        Ok(index)
    }

    pub async fn chain(&self) -> ChainResponse {
        ChainResponse::new(self.blockchain.read().await.blocks().to_vec())
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.blockchain.read().await.pending_transactions().to_vec()
    }

    pub async fn records(&self, patient: &str) -> Vec<PatientRecord> {
        records_for_patient(self.blockchain.read().await.blocks(), patient)
    }

    /// Register peers all-or-nothing and return the full peer list.
    pub async fn register_peers<S: AsRef<str>>(&self, addresses: &[S]) -> Result<Vec<String>, ChainError> {
        let mut peers = self.peers.write().await;
        let added = peers.register_all(addresses)?;
        info!(added, total = peers.len(), "Peers registered");
        Ok(peers.nodes())
    }

    pub async fn peer_list(&self) -> Vec<String> {
        self.peers.read().await.nodes()
    }

    /// Run one consensus round against every registered peer.
    pub async fn resolve(&self) -> ResolveOutcome {
        self.counters.consensus_rounds.fetch_add(1, Ordering::Relaxed);
        let peers = self.peer_list().await;
        let local_length = self.blockchain.read().await.len();

        let candidate = resolve_longest_chain(self.source.clone(), peers, local_length, self.settings).await;

        let mut chain = self.blockchain.write().await;
        let replaced = match candidate {
            Some(candidate) if candidate.len() > chain.len() => {
                let length = candidate.len();
                match chain.replace_chain(candidate) {
                    Ok(()) => {
                        self.counters.chains_replaced.fetch_add(1, Ordering::Relaxed);
                        info!(previous = local_length, length, "Local chain replaced by longer peer chain");
                        true
                    }
                    Err(e) => {
                        warn!("Failed to install peer chain: {}", e);
                        false
                    }
                }
            }
            Some(_) => {
                debug!("Local chain grew past the candidate during resolution");
                false
            }
            None => false,
        };

        ResolveOutcome {
            replaced,
            chain: chain.blocks().to_vec(),
        }
    }

    pub async fn stats(&self) -> NodeStats {
        let (chain_length, pending_transactions, difficulty) = {
            let chain = self.blockchain.read().await;
            (chain.len(), chain.pending_transactions().len(), chain.difficulty())
        };

        NodeStats {
            node_id: self.node_id.clone(),
            chain_length,
            pending_transactions,
            peer_count: self.peers.read().await.len(),
            difficulty: difficulty.leading_zeros(),
            blocks_mined: self.counters.blocks_mined.load(Ordering::Relaxed),
            transactions_submitted: self.counters.transactions_submitted.load(Ordering::Relaxed),
            consensus_rounds: self.counters.consensus_rounds.load(Ordering::Relaxed),
            chains_replaced: self.counters.chains_replaced.load(Ordering::Relaxed),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ChainError> {
        format!("{}:{}", self.config.network.host, self.config.network.api_port)
            .parse::<SocketAddr>()
            .map_err(|e| {
                ChainError::ConfigError(format!(
                    "invalid listen address {}:{}: {}",
                    self.config.network.host, self.config.network.api_port, e
                ))
            })
    }

    /// Mark the node ready and serve the HTTP API until it stops.
    pub async fn start(self: Arc<Self>) -> Result<(), ChainError> {
        let addr = self.listen_addr()?;
        self.set_state(NodeState::Ready).await;
        info!(node_id = %self.node_id, %addr, "Starting MedChain node");
        crate::api::run_api_server(self, addr).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::valid_chain;
    use crate::miner::Difficulty;
    use async_trait::async_trait;
    use std::time::Duration;

    fn easy_config() -> Config {
        let mut config = Config::default();
        config.miner.difficulty = 2;
        config
    }

    struct FixedSource(Vec<Block>);

    #[async_trait]
    impl ChainSource for FixedSource {
        async fn fetch_chain(&self, _peer: &str) -> Result<ChainResponse, ChainError> {
            Ok(ChainResponse::new(self.0.clone()))
        }
    }

    fn peer_chain(length: usize) -> Vec<Block> {
        let mut chain = Blockchain::new(Difficulty::new(2).unwrap());
        while chain.len() < length {
            chain.new_transaction(Transaction::new("peer", "flu", "swab", 1)).unwrap();
            chain.mine().unwrap();
        }
        chain.blocks().to_vec()
    }

    #[tokio::test]
    async fn test_mine_seals_pending_transactions() {
        tokio::time::timeout(Duration::from_secs(10), async {
            let node = Node::with_source(easy_config(), Arc::new(FixedSource(Vec::new()))).unwrap();
            assert_eq!(node.submit_transaction(Transaction::new("a", "b", "c", 1)).await.unwrap(), 2);
            assert_eq!(node.submit_transaction(Transaction::new("d", "e", "f", 2)).await.unwrap(), 2);

            let block = node.mine().await.unwrap();
            assert_eq!(block.index, 2);
            assert_eq!(block.transactions.len(), 2);
            assert!(node.pending_transactions().await.is_empty());

            let stats = node.stats().await;
            assert_eq!(stats.blocks_mined, 1);
            assert_eq!(stats.transactions_submitted, 2);
            assert_eq!(stats.chain_length, 2);
        })
        .await
        .expect("test timed out");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mining_keeps_chain_valid() {
        tokio::time::timeout(Duration::from_secs(30), async {
            let node = Arc::new(Node::with_source(easy_config(), Arc::new(FixedSource(Vec::new()))).unwrap());
            let mut handles = Vec::new();
            for n in 0..6 {
                let node = node.clone();
                handles.push(tokio::spawn(async move {
                    node.submit_transaction(Transaction::new(format!("p{}", n), "x", "y", n)).await.unwrap();
                    node.mine().await.unwrap()
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }

            let chain = node.chain().await;
            assert_eq!(chain.length, 7);
            assert!(valid_chain(&chain.chain, Difficulty::new(2).unwrap()));
            let sealed: usize = chain.chain.iter().map(|b| b.transactions.len()).sum();
            assert_eq!(sealed, 6);
        })
        .await
        .expect("test timed out");
    }

    #[tokio::test]
    async fn test_resolve_adopts_longer_valid_chain() {
        tokio::time::timeout(Duration::from_secs(10), async {
            let longer = peer_chain(4);
            let node = Node::with_source(easy_config(), Arc::new(FixedSource(longer.clone()))).unwrap();
            node.register_peers(&["http://127.0.0.1:6001"]).await.unwrap();
            node.submit_transaction(Transaction::new("local", "a", "b", 1)).await.unwrap();

            let outcome = node.resolve().await;
            assert!(outcome.replaced);
            assert_eq!(outcome.chain, longer);
            assert_eq!(node.pending_transactions().await.len(), 1);
            assert_eq!(node.stats().await.chains_replaced, 1);
        })
        .await
        .expect("test timed out");
    }

    #[tokio::test]
    async fn test_resolve_keeps_chain_when_peers_are_not_longer() {
        tokio::time::timeout(Duration::from_secs(10), async {
            let node = Node::with_source(easy_config(), Arc::new(FixedSource(peer_chain(2)))).unwrap();
            node.mine().await.unwrap();
            node.mine().await.unwrap();
            node.register_peers(&["127.0.0.1:6001", "127.0.0.1:6002"]).await.unwrap();

            let before = node.chain().await;
            let outcome = node.resolve().await;
            assert!(!outcome.replaced);
            assert_eq!(outcome.chain, before.chain);
            assert_eq!(node.chain().await, before);
        })
        .await
        .expect("test timed out");
    }

    #[tokio::test]
    async fn test_bootstrap_peers_and_invalid_registration() {
        tokio::time::timeout(Duration::from_secs(10), async {
            let mut config = easy_config();
            config.network.bootstrap_peers = vec!["http://10.1.1.1:5000".to_string(), "ftp://bad".to_string()];
            let node = Node::with_source(config, Arc::new(FixedSource(Vec::new()))).unwrap();
            assert_eq!(node.peer_list().await, vec!["10.1.1.1:5000".to_string()]);

            assert!(node.register_peers(&["http://"]).await.is_err());
            assert_eq!(node.peer_list().await.len(), 1);
            assert_eq!(node.state().await, NodeState::Booting);
        })
        .await
        .expect("test timed out");
    }
}
