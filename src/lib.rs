//! # NFT Drops
//!
//! Client-side core for an NFT drops marketplace on Solana. Aggregates
//! wallet holdings across an indexer and direct RPC, reconciles backend
//! collection records against canonical chain state, and drives the mint
//! and collection-creation pipelines.
//!
//! ## Quick Start
//! ```no_run
//! # async fn run() -> Result<(), nft_drops::Error> {
//! let state = nft_drops::AppState::new(nft_drops::Config::default())?;
//! let tokens = state.aggregator.owned_tokens("J5zeD8EDjbJDARaMPQWR2QjvSZ1SoSQuj6BYf973EUZS").await;
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod backend;
pub mod chain;
pub mod config;
pub mod create;
mod error;
pub mod indexer;
pub mod ipfs;
pub mod metadata;
pub mod mint;
pub mod model;
mod progress;
pub mod state;
pub mod sync;

pub use config::Config;
pub use error::Error;
pub use model::{
    AuctionListing, Collection, MintedItem, NftAttribute, ResolvedMetadata, TokenSummary,
};
pub use progress::{Progress, ProgressEvent};
pub use state::AppState;
