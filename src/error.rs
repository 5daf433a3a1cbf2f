//! Error types for the drops client.

use std::fmt;

/// Drops client error type.
#[derive(Debug)]
pub enum Error {
    /// Configuration error (bad key file, malformed address, etc.).
    Config(String),
    /// Caller-side precondition violation, rejected before any I/O.
    Validation(String),
    /// Record does not exist in the persistence backend.
    NotFound(String),
    /// Persistence backend request failed.
    Backend(String),
    /// Content storage (pinning API) request failed.
    Ipfs(String),
    /// Primary indexer request failed.
    Indexer(String),
    /// Solana RPC communication error.
    Rpc(String),
    /// On-chain transaction rejected or never confirmed.
    Transaction(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Validation(msg) => write!(f, "validation error: {msg}"),
            Error::NotFound(msg) => write!(f, "not found: {msg}"),
            Error::Backend(msg) => write!(f, "backend error: {msg}"),
            Error::Ipfs(msg) => write!(f, "ipfs error: {msg}"),
            Error::Indexer(msg) => write!(f, "indexer error: {msg}"),
            Error::Rpc(msg) => write!(f, "rpc error: {msg}"),
            Error::Transaction(msg) => write!(f, "transaction error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
