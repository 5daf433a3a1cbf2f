//! Collection synchronizer: reconciles the backend's denormalized record
//! with the canonical on-chain view and keeps a display list of resolved
//! item metadata coherent across the transition.

use crate::backend::BackendClient;
use crate::error::Error;
use crate::indexer::IndexerClient;
use crate::metadata::MetadataResolver;
use crate::model::{Collection, ResolvedMetadata};
use futures::future::join_all;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Per-view synchronization state. A fresh `load_collection` restarts the
/// machine from `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Uninitialized,
    BackendLoaded,
    Reconciling,
    Reconciled,
}

/// Canonical on-chain view of a collection, as far as it could be read.
/// `None`/empty fields leave the backend value in place.
#[derive(Debug, Clone, Default)]
pub struct ChainView {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub creator_address: Option<String>,
    pub max_supply: Option<u32>,
    pub mint_price: Option<f64>,
    pub royalty_percentage: Option<u8>,
    pub nft_metadata_uris: Option<Vec<String>>,
}

struct ViewState {
    phase: SyncPhase,
    collection: Option<Collection>,
    items: Vec<ResolvedMetadata>,
    // Bumped whenever the display list restarts; stale hydration tasks
    // compare against it before appending.
    generation: u64,
}

/// Reconciles backend and on-chain collection state for one view at a time.
#[derive(Clone)]
pub struct CollectionSynchronizer {
    backend: Arc<BackendClient>,
    indexer: Arc<IndexerClient>,
    resolver: Arc<MetadataResolver>,
    view: Arc<RwLock<ViewState>>,
}

impl CollectionSynchronizer {
    pub fn new(
        backend: Arc<BackendClient>,
        indexer: Arc<IndexerClient>,
        resolver: Arc<MetadataResolver>,
    ) -> Self {
        Self {
            backend,
            indexer,
            resolver,
            view: Arc::new(RwLock::new(ViewState {
                phase: SyncPhase::Uninitialized,
                collection: None,
                items: Vec::new(),
                generation: 0,
            })),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.view.read().unwrap_or_else(|e| e.into_inner()).phase
    }

    /// Snapshot of the resolved item display list. Fills in incrementally
    /// while hydration runs.
    pub fn items(&self) -> Vec<ResolvedMetadata> {
        self.view
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .items
            .clone()
    }

    /// The collection as of the latest phase transition.
    pub fn current(&self) -> Option<Collection> {
        self.view
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .collection
            .clone()
    }

    /// Load a collection by mint address and reconcile it against chain
    /// state. The backend is the only mint-address resolver, so a backend
    /// miss is a hard "not found"; a chain-side failure after a successful
    /// backend load leaves the backend view authoritative.
    pub async fn load_collection(&self, collection_mint: &str) -> Result<Collection, Error> {
        {
            let mut view = self.view.write().unwrap_or_else(|e| e.into_inner());
            view.phase = SyncPhase::Uninitialized;
            view.collection = None;
            view.items.clear();
            view.generation += 1;
        }

        let backend_record = self
            .backend
            .collection_by_mint(collection_mint)
            .await
            .map_err(|e| match e {
                found @ Error::NotFound(_) => found,
                other => Error::NotFound(format!("collection {collection_mint}: {other}")),
            })?;

        let generation = {
            let mut view = self.view.write().unwrap_or_else(|e| e.into_inner());
            view.phase = SyncPhase::BackendLoaded;
            view.collection = Some(backend_record.clone());
            view.generation
        };
        debug!(collection_mint, "backend record loaded");

        // Hydrate the display list from the backend's URI sequence without
        // waiting for reconciliation.
        if !backend_record.nft_metadata_uris.is_empty() {
            self.spawn_hydration(backend_record.nft_metadata_uris.clone(), generation);
        }

        {
            let mut view = self.view.write().unwrap_or_else(|e| e.into_inner());
            view.phase = SyncPhase::Reconciling;
        }

        let merged = match self.fetch_chain_view(collection_mint).await {
            Ok(chain_view) => {
                let mut merged = backend_record.clone();
                let uris_replaced = apply_chain_view(&mut merged, chain_view);
                if uris_replaced {
                    info!(collection_mint, "on-chain item sequence differs, rehydrating");
                    let generation = {
                        let mut view = self.view.write().unwrap_or_else(|e| e.into_inner());
                        view.items.clear();
                        view.generation += 1;
                        view.generation
                    };
                    self.spawn_hydration(merged.nft_metadata_uris.clone(), generation);
                }
                merged
            }
            Err(e) => {
                warn!(collection_mint, error = %e, "reconciliation skipped, backend view stays authoritative");
                backend_record
            }
        };

        {
            let mut view = self.view.write().unwrap_or_else(|e| e.into_inner());
            view.collection = Some(merged.clone());
            view.phase = SyncPhase::Reconciled;
        }
        Ok(merged)
    }

    /// Collections created by `creator_address`, each enriched with the
    /// image from its collection metadata document. Enrichment failures
    /// degrade to the bare backend record.
    pub async fn my_collections(&self, creator_address: &str) -> Result<Vec<Collection>, Error> {
        let records = self.backend.collections_by_owner(creator_address).await?;
        let enriched = join_all(records.into_iter().map(|mut c| async move {
            if c.image.is_none() && !c.collection_metadata_uri.is_empty() {
                if let Ok(doc) = self.resolver.fetch_document(&c.collection_metadata_uri).await {
                    if let Some(image) = doc.get("image").and_then(Value::as_str) {
                        c.image = Some(self.resolver.ipfs().to_gateway_url(image));
                    }
                }
            }
            c
        }))
        .await;
        Ok(enriched)
    }

    /// Read the canonical collection state through the indexer plus the
    /// collection-level metadata document.
    async fn fetch_chain_view(&self, collection_mint: &str) -> Result<ChainView, Error> {
        let token = self.indexer.nft_metadata(collection_mint).await?;

        let metadata_uri = token
            .metaplex
            .as_ref()
            .and_then(|m| m.metadata_uri.clone())
            .unwrap_or_default();
        let document = if metadata_uri.is_empty() {
            None
        } else {
            self.resolver.fetch_document(&metadata_uri).await.ok()
        };

        let mut view = ChainView {
            name: token.name.filter(|n| !n.is_empty()),
            symbol: token.symbol.filter(|s| !s.is_empty()),
            royalty_percentage: token
                .metaplex
                .as_ref()
                .and_then(|m| m.seller_fee_basis_points)
                .and_then(|bps| royalty_from_bps(bps as u64)),
            ..ChainView::default()
        };

        if let Some(doc) = document {
            view.description = doc
                .get("description")
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty())
                .map(String::from);
            view.image = doc
                .get("image")
                .and_then(Value::as_str)
                .filter(|i| !i.is_empty())
                .map(|i| self.resolver.ipfs().to_gateway_url(i));
            view.creator_address = doc
                .pointer("/properties/creators/0/address")
                .and_then(Value::as_str)
                .map(String::from);
            view.max_supply = doc
                .get("attributes")
                .and_then(Value::as_array)
                .and_then(|attrs| {
                    attrs.iter().find(|a| {
                        a.get("trait_type").and_then(Value::as_str) == Some("Max Supply")
                    })
                })
                .and_then(|a| a.get("value"))
                .and_then(as_u32);
            view.mint_price = doc.pointer("/properties/mintPrice").and_then(Value::as_f64);
            if view.royalty_percentage.is_none() {
                view.royalty_percentage = doc
                    .get("seller_fee_basis_points")
                    .and_then(Value::as_u64)
                    .and_then(royalty_from_bps);
            }
            view.nft_metadata_uris = doc
                .pointer("/properties/nftMetadataUris")
                .and_then(Value::as_array)
                .map(|uris| {
                    uris.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                });
        }
        Ok(view)
    }

    fn spawn_hydration(&self, uris: Vec<String>, generation: u64) {
        let resolver = self.resolver.clone();
        let view = self.view.clone();
        tokio::spawn(async move {
            resolver
                .resolve_batch(&uris, |batch| {
                    let mut state = view.write().unwrap_or_else(|e| e.into_inner());
                    if state.generation == generation {
                        state.items.extend_from_slice(batch);
                    }
                })
                .await;
        });
    }
}

/// Merge the on-chain view into `collection`. On-chain scalars win when
/// present; the item URI sequence is replaced only when it deep-differs
/// from the backend's. Returns whether the sequence was replaced.
pub fn apply_chain_view(collection: &mut Collection, view: ChainView) -> bool {
    if let Some(name) = view.name {
        collection.name = name;
    }
    if let Some(symbol) = view.symbol {
        collection.symbol = symbol;
    }
    if let Some(description) = view.description {
        collection.description = description;
    }
    if let Some(image) = view.image {
        collection.image = Some(image);
    }
    if let Some(creator) = view.creator_address {
        collection.creator_address = creator;
    }
    if let Some(max_supply) = view.max_supply {
        collection.max_supply = max_supply;
    }
    if let Some(price) = view.mint_price {
        collection.mint_price = price;
    }
    // The royalty range invariant (0..=50) holds even against a bogus
    // provider answer; out-of-range values keep the backend record's.
    if let Some(royalty) = view.royalty_percentage.filter(|r| *r <= 50) {
        collection.royalty_percentage = royalty;
    }
    match view.nft_metadata_uris {
        Some(uris) if uris != collection.nft_metadata_uris => {
            collection.nft_metadata_uris = uris;
            true
        }
        _ => false,
    }
}

/// Royalty percent from provider-supplied basis points. Values outside
/// the 0..=50 percent range are untrusted and dropped rather than
/// truncated into it.
fn royalty_from_bps(bps: u64) -> Option<u8> {
    let pct = bps / 100;
    (pct <= 50).then(|| pct as u8)
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
