//! MedChain - a proof-of-work ledger of patient medical records
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, chain validation and record lookups
//! - [`transaction`] - Medical record transactions
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work search
//! - [`consensus`] - Longest-valid-chain resolution across peers
//!
//! ## Cryptography
//! - [`crypto`] - SHA-256 and canonical hashing
//!
//! ## Networking & Integration
//! - [`network`] - Peer registry and peer chain fetching
//! - [`node`] - The node handle shared by every request
//! - [`api`] - HTTP API
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod consensus;
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Networking & Integration
// ============================================================================
pub mod api;
pub mod network;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
