// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// block construction, chain validation and record lookups.

pub mod core;
pub use core::*;
