// =============================================================================
// Pipeline Integration Tests
// =============================================================================
// End-to-end tests against in-process mock servers:
// - Backend collection/auction CRUD
// - Metadata resolution through a mock gateway
// - Owned-token aggregation with indexer primary and cache
// - Collection synchronization (backend vs chain view reconciliation)
// - Creation pipeline preconditions (no uploads on invalid input)
//
// Run with:
//   cargo test --test pipeline

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use nft_drops::aggregator::NftAggregator;
use nft_drops::backend::BackendClient;
use nft_drops::chain::ChainClient;
use nft_drops::create::{CreateCollectionRequest, CreationPipeline, ItemImage};
use nft_drops::indexer::IndexerClient;
use nft_drops::ipfs::IpfsClient;
use nft_drops::metadata::MetadataResolver;
use nft_drops::model::now_iso;
use nft_drops::sync::{CollectionSynchronizer, SyncPhase};
use nft_drops::{AuctionListing, Collection, Config, Error, MintedItem, Progress};
use serde_json::{json, Value};
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "nft_drops=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Bind an ephemeral port and serve `app` for the rest of the test process.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Mock backend: stateful collection/auction store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BackendStore {
    collections: HashMap<String, Value>,
    auctions: Vec<Value>,
}

type Store = Arc<Mutex<BackendStore>>;

async fn mock_backend() -> (String, Store) {
    let store: Store = Arc::new(Mutex::new(BackendStore::default()));

    async fn create(State(s): State<Store>, Json(body): Json<Value>) -> Json<Value> {
        let mint = body["collectionMint"].as_str().unwrap_or_default().to_string();
        s.lock().unwrap().collections.insert(mint, body.clone());
        Json(json!({ "collection": body }))
    }

    async fn single(
        State(s): State<Store>,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        let store = s.lock().unwrap();
        store
            .collections
            .get(body["collectionMint"].as_str().unwrap_or_default())
            .map(|c| Json(json!({ "collection": c })))
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn all(State(s): State<Store>) -> Result<Json<Value>, StatusCode> {
        let store = s.lock().unwrap();
        if store.collections.is_empty() {
            return Err(StatusCode::NOT_FOUND);
        }
        let list: Vec<&Value> = store.collections.values().collect();
        Ok(Json(json!({ "collections": list })))
    }

    async fn by_owner(
        State(s): State<Store>,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        let creator = body["creatorAddress"].as_str().unwrap_or_default();
        let store = s.lock().unwrap();
        let list: Vec<&Value> = store
            .collections
            .values()
            .filter(|c| c["creatorAddress"].as_str() == Some(creator))
            .collect();
        if list.is_empty() {
            return Err(StatusCode::NOT_FOUND);
        }
        Ok(Json(json!({ "collections": list })))
    }

    async fn update(
        State(s): State<Store>,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        let mut store = s.lock().unwrap();
        let mint = body["collectionMint"].as_str().unwrap_or_default();
        let record = store
            .collections
            .get_mut(mint)
            .ok_or(StatusCode::NOT_FOUND)?;
        if record["mintedNfts"].is_null() {
            record["mintedNfts"] = json!([]);
        }
        // Push semantics: appended, never replaced.
        let appended = body["mintedNfts"].as_array().cloned().unwrap_or_default();
        record["mintedNfts"]
            .as_array_mut()
            .unwrap()
            .extend(appended);
        Ok(Json(json!({ "success": true })))
    }

    async fn auction_fetch(State(s): State<Store>) -> Json<Value> {
        Json(json!({ "auctions": s.lock().unwrap().auctions }))
    }

    async fn auction_add(
        State(s): State<Store>,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        let mut store = s.lock().unwrap();
        let mint = body["mint"].as_str().unwrap_or_default();
        if store.auctions.iter().any(|a| a["mint"].as_str() == Some(mint)) {
            return Err(StatusCode::CONFLICT);
        }
        store.auctions.push(body);
        Ok(Json(json!({ "success": true })))
    }

    async fn auction_remove(State(s): State<Store>, Json(body): Json<Value>) -> Json<Value> {
        let mint = body["mint"].as_str().unwrap_or_default().to_string();
        s.lock()
            .unwrap()
            .auctions
            .retain(|a| a["mint"].as_str() != Some(mint.as_str()));
        Json(json!({ "success": true }))
    }

    let app = Router::new()
        .route("/nft/create", post(create))
        .route("/nft/single", post(single))
        .route("/nft/all", post(all))
        .route("/nft/by-owner", post(by_owner))
        .route("/nft/update", patch(update))
        .route("/auction/fetch", post(auction_fetch))
        .route("/auction/add", post(auction_add))
        .route("/auction/remove", post(auction_remove))
        .with_state(store.clone());

    (serve(app).await, store)
}

// ---------------------------------------------------------------------------
// Mock gateway: canned metadata documents with per-path hit counts
// ---------------------------------------------------------------------------

type Docs = Arc<Mutex<HashMap<String, Value>>>;
type Hits = Arc<Mutex<HashMap<String, usize>>>;

async fn mock_gateway(docs: HashMap<String, Value>) -> (String, Hits) {
    let hits: Hits = Arc::new(Mutex::new(HashMap::new()));
    let state = (Arc::new(Mutex::new(docs)) as Docs, hits.clone());

    async fn doc(
        State((docs, hits)): State<(Docs, Hits)>,
        Path(name): Path<String>,
    ) -> Result<Json<Value>, StatusCode> {
        *hits.lock().unwrap().entry(name.clone()).or_insert(0) += 1;
        docs.lock()
            .unwrap()
            .get(&name)
            .cloned()
            .map(Json)
            .ok_or(StatusCode::NOT_FOUND)
    }

    let app = Router::new().route("/{name}", get(doc)).with_state(state);
    (serve(app).await, hits)
}

// ---------------------------------------------------------------------------
// Mock indexer: Moralis-compatible account/metadata routes
// ---------------------------------------------------------------------------

struct IndexerFixture {
    owned: Value,
    metadata: HashMap<String, Value>,
    owner_hits: AtomicUsize,
}

async fn mock_indexer(fixture: IndexerFixture) -> (String, Arc<IndexerFixture>) {
    let fixture = Arc::new(fixture);

    async fn owned(
        State(f): State<Arc<IndexerFixture>>,
        Path((_network, _address)): Path<(String, String)>,
    ) -> Json<Value> {
        f.owner_hits.fetch_add(1, Ordering::SeqCst);
        Json(f.owned.clone())
    }

    async fn metadata(
        State(f): State<Arc<IndexerFixture>>,
        Path((_network, mint)): Path<(String, String)>,
    ) -> Result<Json<Value>, StatusCode> {
        f.metadata
            .get(&mint)
            .cloned()
            .map(Json)
            .ok_or(StatusCode::NOT_FOUND)
    }

    let app = Router::new()
        .route("/account/{network}/{address}/nft", get(owned))
        .route("/nft/{network}/{mint}/metadata", get(metadata))
        .with_state(fixture.clone());

    (serve(app).await, fixture)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn sample_collection(mint: &str, creator: &str, uris: Vec<String>) -> Collection {
    Collection {
        collection_mint: mint.into(),
        name: "Genesis Drop".into(),
        symbol: "GEN".into(),
        description: "first drop".into(),
        creator_address: creator.into(),
        mint_price: 1.5,
        max_supply: 10,
        royalty_percentage: 5,
        created_at: now_iso(),
        collection_metadata_uri: "ipfs://genesis".into(),
        image: None,
        nft_metadata_uris: uris,
        minted_nfts: Vec::new(),
    }
}

fn backend_client(base_url: &str) -> BackendClient {
    BackendClient::new(&Config {
        backend_url: base_url.into(),
        ..Config::default()
    })
    .unwrap()
}

fn resolver_for(gateway: &str) -> Arc<MetadataResolver> {
    let ipfs = Arc::new(
        IpfsClient::new(&Config {
            ipfs_gateway: gateway.into(),
            ..Config::default()
        })
        .unwrap(),
    );
    Arc::new(MetadataResolver::new(ipfs).unwrap())
}

// ---------------------------------------------------------------------------
// Backend CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_backend_collection_crud_round_trip() -> Result<()> {
    init_tracing();
    let (url, _store) = mock_backend().await;
    let client = backend_client(&url);

    let created = client
        .create_collection(&sample_collection(
            "ColMint1",
            "Creator1",
            vec!["ipfs://m0".into(), "ipfs://m1".into()],
        ))
        .await?;
    assert_eq!(created.collection_mint, "ColMint1");

    let fetched = client.collection_by_mint("ColMint1").await?;
    assert_eq!(fetched, created);

    let all = client.all_collections().await?;
    assert_eq!(all.len(), 1);

    let mine = client.collections_by_owner("Creator1").await?;
    assert_eq!(mine.len(), 1);
    let none = client.collections_by_owner("Stranger").await?;
    assert!(none.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_backend_append_minted_pushes_not_replaces() -> Result<()> {
    init_tracing();
    let (url, _store) = mock_backend().await;
    let client = backend_client(&url);

    client
        .create_collection(&sample_collection(
            "ColMint2",
            "Creator1",
            vec!["ipfs://m0".into(), "ipfs://m1".into()],
        ))
        .await?;

    let item = |index: u32| MintedItem {
        nft_mint: format!("Mint{index}"),
        nft_index: index,
        nft_metadata_uri: format!("ipfs://m{index}"),
        minted_at: now_iso(),
    };
    client.append_minted("ColMint2", &[item(0)]).await?;
    client.append_minted("ColMint2", &[item(1)]).await?;

    let fetched = client.collection_by_mint("ColMint2").await?;
    assert_eq!(fetched.minted_nfts.len(), 2);
    assert_eq!(fetched.minted_nfts[0].nft_index, 0);
    assert_eq!(fetched.minted_nfts[1].nft_index, 1);
    Ok(())
}

#[tokio::test]
async fn test_backend_missing_collection_is_not_found() -> Result<()> {
    init_tracing();
    let (url, _store) = mock_backend().await;
    let client = backend_client(&url);

    let err = client.collection_by_mint("Nope").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    // An empty store answers "no collections", not an error.
    assert!(client.all_collections().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_auction_listing_lifecycle() -> Result<()> {
    init_tracing();
    let (url, _store) = mock_backend().await;
    let client = backend_client(&url);

    let listing = AuctionListing {
        mint: "NftMint1".into(),
        owner: "Owner1".into(),
        price: 2.0,
        metadata_uri: "ipfs://m0".into(),
        created_at: now_iso(),
    };
    client.add_auction(&listing).await?;

    // Duplicate mint rejected as a validation error (backend 409).
    let err = client.add_auction(&listing).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(client.auctions().await?.len(), 1);
    client.remove_auction("NftMint1").await?;
    assert!(client.auctions().await?.is_empty());
    Ok(())
}

// ---------------------------------------------------------------------------
// Metadata resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_resolver_mixes_real_documents_and_placeholders() -> Result<()> {
    init_tracing();
    let mut docs = HashMap::new();
    docs.insert(
        "item-0.json".to_string(),
        json!({ "name": "Ape #1", "image": "ipfs://img-0", "attributes": [{ "trait_type": "Hat", "value": "Crown" }] }),
    );
    // item-1.json deliberately absent: the gateway answers 404.
    let (gateway, _hits) = mock_gateway(docs).await;
    let resolver = resolver_for(&gateway);

    let uris = vec![
        format!("{gateway}/item-0.json"),
        format!("{gateway}/item-1.json"),
    ];
    let results = resolver.resolve_batch(&uris, |_| {}).await;

    assert_eq!(results[0].name, "Ape #1");
    assert_eq!(results[0].image, format!("{gateway}/img-0"));
    assert_eq!(results[0].attributes.len(), 1);
    // The failed fetch degrades to the positional placeholder.
    assert_eq!(results[1].name, "NFT #2");
    assert_eq!(results[1].image, "/placeholder.svg?height=300&width=300");
    Ok(())
}

// ---------------------------------------------------------------------------
// Owned-token aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_aggregator_prefers_indexer_and_caches() -> Result<()> {
    init_tracing();
    let (indexer_url, fixture) = mock_indexer(IndexerFixture {
        owned: json!([
            { "mint": "MintA", "name": "Token A", "symbol": "A" },
            { "mint": "MintB", "name": "Token B", "symbol": "B" },
        ]),
        metadata: HashMap::new(),
        owner_hits: AtomicUsize::new(0),
    })
    .await;

    let config = Config {
        indexer_url,
        rpc_url: "http://127.0.0.1:9".into(),
        ..Config::default()
    };
    let aggregator = NftAggregator::new(
        Arc::new(IndexerClient::new(&config).unwrap()),
        Arc::new(ChainClient::new(&config.rpc_url)),
        resolver_for("http://127.0.0.1:9"),
    );

    let wallet = Keypair::new().pubkey().to_string();
    let first = aggregator.owned_tokens(&wallet).await;
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].mint, "MintA");
    assert_eq!(fixture.owner_hits.load(Ordering::SeqCst), 1);

    // Fresh cache answers immediately; the background revalidation may add
    // at most one more provider hit.
    let second = aggregator.owned_tokens(&wallet).await;
    assert_eq!(second, first);
    assert!(fixture.owner_hits.load(Ordering::SeqCst) <= 2);
    Ok(())
}

#[tokio::test]
async fn test_aggregator_empty_when_all_providers_fail() -> Result<()> {
    init_tracing();
    // Indexer answers HTTP 500 for every route; RPC endpoint is dead.
    let app = Router::new().fallback(|| async { StatusCode::INTERNAL_SERVER_ERROR });
    let indexer_url = serve(app).await;

    let config = Config {
        indexer_url,
        rpc_url: "http://127.0.0.1:9".into(),
        ..Config::default()
    };
    let aggregator = NftAggregator::new(
        Arc::new(IndexerClient::new(&config).unwrap()),
        Arc::new(ChainClient::new(&config.rpc_url)),
        resolver_for("http://127.0.0.1:9"),
    );

    let tokens = aggregator
        .owned_tokens(&Keypair::new().pubkey().to_string())
        .await;
    assert!(tokens.is_empty());
    Ok(())
}

// ---------------------------------------------------------------------------
// Collection synchronization
// ---------------------------------------------------------------------------

async fn wait_for_items(sync: &CollectionSynchronizer, expected: usize) {
    for _ in 0..100 {
        if sync.items().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("hydration did not reach {expected} items");
}

#[tokio::test]
async fn test_synchronizer_merges_chain_view_over_backend() -> Result<()> {
    init_tracing();
    let (backend_url, _store) = mock_backend().await;
    let backend = Arc::new(backend_client(&backend_url));

    // Item URIs are content-addressed, so the backend record and the
    // collection document can carry byte-identical sequences while the
    // resolver rewrites them against the mock gateway.
    let item_uris = vec!["ipfs://item-0.json".to_string(), "ipfs://item-1.json".to_string()];
    let mut docs = HashMap::new();
    docs.insert("item-0.json".to_string(), json!({ "name": "Gen #1" }));
    docs.insert("item-1.json".to_string(), json!({ "name": "Gen #2" }));
    docs.insert(
        "collection.json".to_string(),
        json!({
            "description": "authoritative description",
            "image": "ipfs://chain-image",
            "attributes": [{ "trait_type": "Max Supply", "value": "20" }],
            "properties": {
                "mintPrice": 2.5,
                "creators": [{ "address": "ChainCreator", "share": 100 }],
                "nftMetadataUris": item_uris.clone(),
            },
        }),
    );
    let (gateway, hits) = mock_gateway(docs).await;

    let (indexer_url, _fixture) = mock_indexer(IndexerFixture {
        owned: json!([]),
        metadata: HashMap::from([(
            "ColMint1".to_string(),
            json!({
                "mint": "ColMint1",
                "name": "Chain Name",
                "symbol": "CHN",
                "metaplex": {
                    "metadataUri": "ipfs://collection.json",
                    "sellerFeeBasisPoints": 700,
                },
            }),
        )]),
        owner_hits: AtomicUsize::new(0),
    })
    .await;

    backend
        .create_collection(&sample_collection("ColMint1", "Creator1", item_uris.clone()))
        .await?;

    let indexer = Arc::new(
        IndexerClient::new(&Config {
            indexer_url,
            ..Config::default()
        })
        .unwrap(),
    );
    let sync = CollectionSynchronizer::new(backend, indexer, resolver_for(&gateway));

    let merged = sync.load_collection("ColMint1").await?;

    assert_eq!(sync.phase(), SyncPhase::Reconciled);
    // Chain scalars win over the backend record.
    assert_eq!(merged.name, "Chain Name");
    assert_eq!(merged.symbol, "CHN");
    assert_eq!(merged.description, "authoritative description");
    assert_eq!(merged.mint_price, 2.5);
    assert_eq!(merged.max_supply, 20);
    assert_eq!(merged.royalty_percentage, 7);
    assert_eq!(merged.image, Some(format!("{gateway}/chain-image")));

    wait_for_items(&sync, 2).await;
    let items = sync.items();
    assert_eq!(items[0].name, "Gen #1");
    assert_eq!(items[1].name, "Gen #2");

    // Identical URI sequences must not trigger a second hydration round.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let hits = hits.lock().unwrap();
    assert_eq!(hits.get("item-0.json"), Some(&1));
    assert_eq!(hits.get("item-1.json"), Some(&1));
    Ok(())
}

#[tokio::test]
async fn test_synchronizer_backend_wins_when_chain_unreachable() -> Result<()> {
    init_tracing();
    let (backend_url, _store) = mock_backend().await;
    let backend = Arc::new(backend_client(&backend_url));
    backend
        .create_collection(&sample_collection("ColMint9", "Creator1", Vec::new()))
        .await?;

    let indexer = Arc::new(
        IndexerClient::new(&Config {
            indexer_url: "http://127.0.0.1:9".into(),
            ..Config::default()
        })
        .unwrap(),
    );
    let sync = CollectionSynchronizer::new(
        backend,
        indexer,
        resolver_for("http://127.0.0.1:9"),
    );

    let merged = sync.load_collection("ColMint9").await?;
    // Reconciliation failed silently; the backend record stands.
    assert_eq!(sync.phase(), SyncPhase::Reconciled);
    assert_eq!(merged.name, "Genesis Drop");
    Ok(())
}

#[tokio::test]
async fn test_synchronizer_unknown_mint_is_not_found() -> Result<()> {
    init_tracing();
    let (backend_url, _store) = mock_backend().await;
    let sync = CollectionSynchronizer::new(
        Arc::new(backend_client(&backend_url)),
        Arc::new(
            IndexerClient::new(&Config {
                indexer_url: "http://127.0.0.1:9".into(),
                ..Config::default()
            })
            .unwrap(),
        ),
        resolver_for("http://127.0.0.1:9"),
    );

    let err = sync.load_collection("Missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(sync.phase(), SyncPhase::Uninitialized);
    Ok(())
}

#[tokio::test]
async fn test_my_collections_enriched_with_metadata_image() -> Result<()> {
    init_tracing();
    let (backend_url, _store) = mock_backend().await;
    let backend = Arc::new(backend_client(&backend_url));

    let docs = HashMap::from([(
        "colmeta.json".to_string(),
        json!({ "image": "ipfs://colimg" }),
    )]);
    let (gateway, _hits) = mock_gateway(docs).await;

    let mut with_doc = sample_collection("ColA", "Creator1", Vec::new());
    with_doc.collection_metadata_uri = "ipfs://colmeta.json".into();
    let mut without_doc = sample_collection("ColB", "Creator1", Vec::new());
    without_doc.collection_metadata_uri = "ipfs://missing.json".into();
    backend.create_collection(&with_doc).await?;
    backend.create_collection(&without_doc).await?;

    let sync = CollectionSynchronizer::new(
        backend,
        Arc::new(
            IndexerClient::new(&Config {
                indexer_url: "http://127.0.0.1:9".into(),
                ..Config::default()
            })
            .unwrap(),
        ),
        resolver_for(&gateway),
    );

    let mut mine = sync.my_collections("Creator1").await?;
    mine.sort_by(|a, b| a.collection_mint.cmp(&b.collection_mint));
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].image, Some(format!("{gateway}/colimg")));
    // The unreadable document degrades to the bare record.
    assert_eq!(mine[1].image, None);
    Ok(())
}

#[tokio::test]
async fn test_created_metadata_round_trips_through_synchronizer() -> Result<()> {
    init_tracing();
    let uris = vec!["ipfs://rt-0.json".to_string(), "ipfs://rt-1.json".to_string()];
    let request = CreateCollectionRequest {
        name: "Round Trip".into(),
        symbol: "RT".into(),
        description: "round trip drop".into(),
        mint_price: 3.25,
        max_supply: 7,
        royalty_percentage: 4,
        collection_image: ItemImage {
            bytes: vec![0u8; 8],
            content_type: "image/png".into(),
        },
        item_images: Vec::new(),
    };
    let doc = nft_drops::create::build_collection_metadata(
        &request,
        "ipfs://rt-image",
        "Creator1",
        &uris,
    );

    let (gateway, _hits) = mock_gateway(HashMap::from([("collection.json".to_string(), doc)])).await;
    let (indexer_url, _fixture) = mock_indexer(IndexerFixture {
        owned: json!([]),
        metadata: HashMap::from([(
            "RtMint1".to_string(),
            json!({
                "mint": "RtMint1",
                "name": "Round Trip",
                "symbol": "RT",
                "metaplex": { "metadataUri": "ipfs://collection.json", "sellerFeeBasisPoints": 400 },
            }),
        )]),
        owner_hits: AtomicUsize::new(0),
    })
    .await;

    // Backend holds a stale record: old name, old price, same URI sequence.
    let (backend_url, _store) = mock_backend().await;
    let backend = Arc::new(backend_client(&backend_url));
    let mut stale = sample_collection("RtMint1", "Creator1", uris.clone());
    stale.name = "Old Name".into();
    stale.mint_price = 0.1;
    stale.max_supply = 7;
    backend.create_collection(&stale).await?;

    let sync = CollectionSynchronizer::new(
        backend,
        Arc::new(
            IndexerClient::new(&Config {
                indexer_url,
                ..Config::default()
            })
            .unwrap(),
        ),
        resolver_for(&gateway),
    );

    // What creation pinned is exactly what synchronization reads back.
    let merged = sync.load_collection("RtMint1").await?;
    assert_eq!(merged.name, request.name);
    assert_eq!(merged.symbol, request.symbol);
    assert_eq!(merged.description, request.description);
    assert_eq!(merged.mint_price, request.mint_price);
    assert_eq!(merged.max_supply, request.max_supply);
    assert_eq!(merged.royalty_percentage, request.royalty_percentage);
    assert_eq!(merged.nft_metadata_uris, uris);
    Ok(())
}

// ---------------------------------------------------------------------------
// Creation pipeline preconditions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_creation_oversupply_performs_zero_uploads() -> Result<()> {
    init_tracing();
    let pin_hits = Arc::new(AtomicUsize::new(0));
    let hits = pin_hits.clone();
    let app = Router::new().fallback(move || {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Json(json!({ "IpfsHash": "QmMockHash" }))
        }
    });
    let pin_url = serve(app).await;

    let config = Config {
        pinning_api_url: pin_url,
        rpc_url: "http://127.0.0.1:9".into(),
        backend_url: "http://127.0.0.1:9".into(),
        ..Config::default()
    };
    let pipeline = CreationPipeline::new(
        Arc::new(ChainClient::new(&config.rpc_url)),
        Arc::new(IpfsClient::new(&config).unwrap()),
        Arc::new(BackendClient::new(&config).unwrap()),
        Arc::new(Keypair::new()),
    );

    let request = CreateCollectionRequest {
        name: "Over".into(),
        symbol: "OV".into(),
        description: String::new(),
        mint_price: 1.0,
        max_supply: 2,
        royalty_percentage: 5,
        collection_image: ItemImage {
            bytes: vec![0u8; 8],
            content_type: "image/png".into(),
        },
        item_images: (0..3)
            .map(|_| ItemImage {
                bytes: vec![1u8; 8],
                content_type: "image/png".into(),
            })
            .collect(),
    };

    let collector = Arc::new(Mutex::new(Vec::new()));
    let sink = collector.clone();
    let progress = Progress::new(move |e| sink.lock().unwrap().push(e.percent));

    let err = pipeline.create(request, &progress).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(pin_hits.load(Ordering::SeqCst), 0);
    // Validation is the only checkpoint reached.
    assert_eq!(*collector.lock().unwrap(), vec![0]);
    Ok(())
}
