//! Owned-token aggregation across the primary indexer and a direct-chain
//! fallback, with a per-wallet cache.
//!
//! Cache policy is stale-while-revalidate: a fresh entry (under 5 minutes
//! old) is served immediately while a background refresh updates it. The
//! two sources are never combined; the fallback runs only when the primary
//! errors or returns nothing.

use crate::chain::ChainClient;
use crate::indexer::IndexerClient;
use crate::metadata::MetadataResolver;
use crate::model::TokenSummary;
use futures::future::join_all;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cache entry lifetime.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CachedTokens {
    tokens: Vec<TokenSummary>,
    fetched_at: Instant,
}

/// Aggregates a wallet's held tokens from multiple providers.
#[derive(Clone)]
pub struct NftAggregator {
    indexer: Arc<IndexerClient>,
    chain: Arc<ChainClient>,
    resolver: Arc<MetadataResolver>,
    cache: Arc<RwLock<HashMap<String, CachedTokens>>>,
}

impl NftAggregator {
    pub fn new(
        indexer: Arc<IndexerClient>,
        chain: Arc<ChainClient>,
        resolver: Arc<MetadataResolver>,
    ) -> Self {
        Self {
            indexer,
            chain,
            resolver,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Tokens held by `wallet`. Serves a fresh cache entry immediately and
    /// refreshes in the background; otherwise resolves synchronously. An
    /// empty result means "no NFTs", never an error.
    pub async fn owned_tokens(&self, wallet: &str) -> Vec<TokenSummary> {
        if let Some(tokens) = self.cached(wallet) {
            debug!(wallet, count = tokens.len(), "serving owned tokens from cache");
            let this = self.clone();
            let wallet = wallet.to_string();
            tokio::spawn(async move {
                this.refresh(&wallet).await;
            });
            return tokens;
        }
        self.refresh(wallet).await
    }

    /// Drop the cache entry for `wallet`, forcing the next call to fetch.
    pub fn invalidate(&self, wallet: &str) {
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(wallet);
    }

    fn cached(&self, wallet: &str) -> Option<Vec<TokenSummary>> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        let entry = cache.get(wallet)?;
        (entry.fetched_at.elapsed() < CACHE_TTL).then(|| entry.tokens.clone())
    }

    async fn refresh(&self, wallet: &str) -> Vec<TokenSummary> {
        let tokens = self.fetch_any(wallet).await;
        if !tokens.is_empty() {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            cache.insert(
                wallet.to_string(),
                CachedTokens {
                    tokens: tokens.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
        tokens
    }

    /// Primary provider first; fall back to direct-chain enumeration only
    /// on primary failure or an empty primary answer.
    async fn fetch_any(&self, wallet: &str) -> Vec<TokenSummary> {
        match self.indexer.nfts_by_owner(wallet).await {
            Ok(tokens) if !tokens.is_empty() => {
                info!(wallet, count = tokens.len(), "owned tokens from primary indexer");
                return tokens;
            }
            Ok(_) => info!(wallet, "primary indexer returned no tokens, trying direct RPC"),
            Err(e) => warn!(wallet, error = %e, "primary indexer failed, trying direct RPC"),
        }

        match self.from_chain(wallet).await {
            Ok(tokens) => {
                info!(wallet, count = tokens.len(), "owned tokens from direct RPC");
                tokens
            }
            Err(e) => {
                warn!(wallet, error = %e, "direct RPC enumeration failed");
                Vec::new()
            }
        }
    }

    async fn from_chain(&self, wallet: &str) -> Result<Vec<TokenSummary>, crate::Error> {
        let owner: Pubkey = wallet
            .parse()
            .map_err(|e| crate::Error::Rpc(format!("invalid wallet address {wallet}: {e}")))?;
        let mints = self.chain.owned_nft_mints(&owner).await?;
        // Per-item failures are dropped, not retried.
        let summaries = join_all(mints.iter().map(|mint| self.chain_token(mint))).await;
        Ok(summaries.into_iter().flatten().collect())
    }

    async fn chain_token(&self, mint: &Pubkey) -> Option<TokenSummary> {
        let meta = match self.chain.token_metadata(mint).await {
            Ok(m) => m,
            Err(e) => {
                debug!(mint = %mint, error = %e, "skipping token without readable metadata");
                return None;
            }
        };

        // External document failure degrades to the on-chain fields alone.
        let mut image_url = String::new();
        let mut document = None;
        if !meta.uri.is_empty() {
            if let Ok(doc) = self.resolver.fetch_document(&meta.uri).await {
                if let Some(image) = doc.get("image").and_then(Value::as_str) {
                    image_url = self.resolver.ipfs().to_gateway_url(image);
                }
                document = Some(doc);
            }
        }

        Some(TokenSummary {
            mint: mint.to_string(),
            name: meta.name,
            symbol: meta.symbol,
            metadata_uri: meta.uri,
            image_url,
            metadata: document,
        })
    }
}
