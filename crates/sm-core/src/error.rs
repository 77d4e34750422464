//! Error type shared by the automaton and the prefix tree.
//!
//! A lookup that finds nothing is not an error: radix queries return
//! `Option` and `consume` reports a match count of zero.

use std::collections::TryReserveError;

/// Error type for tree construction and address parsing.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
    #[error("Empty pattern")]
    EmptyPattern,
    #[error("Embedded NUL byte at offset {offset}")]
    EmbeddedNul { offset: usize },
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid mask: {0}")]
    InvalidMask(String),
    #[error("Prefix length {len} exceeds {available} available bits")]
    PrefixLength { len: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, MatchError>;
