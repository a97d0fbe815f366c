//! Proof-of-work search
//!
//! A proof `p` is valid against the previous proof `lp` when the SHA-256 hex
//! digest of the decimal concatenation `"{lp}{p}"` starts with `difficulty`
//! zero characters. The search walks upward from zero and has no attempt cap.

use crate::crypto::sha256;
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DIFFICULTY: usize = 4;

/// Maximum leading zero hex characters a SHA-256 hex digest can carry.
pub const MAX_DIFFICULTY: usize = 64;

/// Number of leading `'0'` hex characters a proof digest must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Difficulty(usize);

impl Difficulty {
    pub fn new(leading_zeros: usize) -> Result<Self, ChainError> {
        if leading_zeros == 0 || leading_zeros > MAX_DIFFICULTY {
            return Err(ChainError::InvalidDifficulty(leading_zeros));
        }
        Ok(Difficulty(leading_zeros))
    }

    pub fn leading_zeros(&self) -> usize {
        self.0
    }

    /// Checks a raw digest without hex encoding it. Two hex characters per
    /// byte; an odd count also constrains the high nibble of the next byte.
    fn accepts(&self, digest: &[u8; 32]) -> bool {
        let full_bytes = self.0 / 2;
        if digest[..full_bytes].iter().any(|b| *b != 0) {
            return false;
        }
        self.0 % 2 == 0 || digest[full_bytes] >> 4 == 0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty(DEFAULT_DIFFICULTY)
    }
}

impl TryFrom<usize> for Difficulty {
    type Error = ChainError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Difficulty::new(value)
    }
}

impl From<Difficulty> for usize {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pure predicate: does `"{last_proof}{proof}"` hash below the difficulty target?
pub fn valid_proof(last_proof: u64, proof: u64, difficulty: Difficulty) -> bool {
    let guess = format!("{}{}", last_proof, proof);
    difficulty.accepts(&sha256(guess.as_bytes()))
}

/// Returns the smallest non-negative proof valid against `last_proof`.
pub fn proof_of_work(last_proof: u64, difficulty: Difficulty) -> u64 {
    let mut proof = 0;
    while !valid_proof(last_proof, proof, difficulty) {
        proof += 1;
    }
    proof
}
