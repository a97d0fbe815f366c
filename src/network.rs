//! Peer registry and the peer chain-fetch contract
//!
//! Every peer is expected to answer `GET http://{host:port}/chain` with
//! `{"chain": [...], "length": N}`. Anything else gets that peer skipped.

use crate::blockchain::Block;
use crate::error::ChainError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Wire body of `GET /chain`, served by every node and expected from every peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: u64,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len() as u64;
        Self { chain, length }
    }
}

/// Extract the `host[:port]` network location from a peer address.
///
/// Accepts full URLs (`http://10.0.0.5:5000/`) and bare locations
/// (`10.0.0.5:5000`). Rejects anything without a host and any scheme other
/// than plain http, since peers are only ever fetched over http.
pub fn parse_peer_address(address: &str) -> Result<String, ChainError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(ChainError::InvalidPeerAddress("address is empty".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| ChainError::InvalidPeerAddress(format!("{}: {}", trimmed, e)))?;

    if url.scheme() != "http" {
        return Err(ChainError::InvalidPeerAddress(format!(
            "{}: unsupported scheme '{}'",
            trimmed,
            url.scheme()
        )));
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => {
            return Err(ChainError::InvalidPeerAddress(format!(
                "{}: missing host",
                trimmed
            )))
        }
    };

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Deduplicated set of known peer locations.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    nodes: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. Returns `true` when the location was not known yet.
    pub fn register_node(&mut self, address: &str) -> Result<bool, ChainError> {
        let location = parse_peer_address(address)?;
        Ok(self.nodes.insert(location))
    }

    /// Register every address or none of them.
    pub fn register_all<S: AsRef<str>>(&mut self, addresses: &[S]) -> Result<usize, ChainError> {
        let locations = addresses
            .iter()
            .map(|address| parse_peer_address(address.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(locations
            .into_iter()
            .filter(|location| self.nodes.insert(location.clone()))
            .count())
    }

    pub fn nodes(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Where the consensus resolver gets peer chains from.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, ChainError>;
}

/// [`ChainSource`] that talks to peers over plain http.
#[derive(Debug, Clone)]
pub struct HttpChainSource {
    client: reqwest::Client,
}

impl HttpChainSource {
    pub fn new(timeout: Duration) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::NetworkError(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChainSource for HttpChainSource {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, ChainError> {
        let url = format!("http://{}/chain", peer);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::NetworkError(format!(
                "{} answered with status {}",
                url, status
            )));
        }

        let body: ChainResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidPeerResponse(format!("{}: {}", url, e)))?;

        if body.length != body.chain.len() as u64 {
            return Err(ChainError::InvalidPeerResponse(format!(
                "{} claims length {} but sent {} blocks",
                url,
                body.length,
                body.chain.len()
            )));
        }

        Ok(body)
    }
}
