//! Error types for MedChain

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Invalid block linkage at index {0}")]
    InvalidBlockLinkage(u64),
    #[error("Invalid proof of work at index {0}")]
    InvalidProofOfWork(u64),
    #[error("Invalid peer address: {0}")]
    InvalidPeerAddress(String),
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Invalid difficulty: {0}")]
    InvalidDifficulty(usize),
    #[error("Mining error: {0}")]
    MiningError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid peer response: {0}")]
    InvalidPeerResponse(String),
    #[error("Peer timed out: {0}")]
    PeerTimeout(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChainError::InvalidPeerResponse(err.to_string())
        } else {
            ChainError::NetworkError(err.to_string())
        }
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
