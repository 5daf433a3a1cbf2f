//! Application state: every component wired up once from configuration.

use crate::aggregator::NftAggregator;
use crate::backend::BackendClient;
use crate::chain::ChainClient;
use crate::config::Config;
use crate::create::CreationPipeline;
use crate::indexer::IndexerClient;
use crate::ipfs::IpfsClient;
use crate::metadata::MetadataResolver;
use crate::mint::MintOrchestrator;
use crate::sync::CollectionSynchronizer;
use solana_sdk::signature::{read_keypair_file, Keypair};
use solana_sdk::signer::Signer;
use std::sync::Arc;
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub chain: Arc<ChainClient>,
    pub ipfs: Arc<IpfsClient>,
    pub indexer: Arc<IndexerClient>,
    pub backend: Arc<BackendClient>,
    pub resolver: Arc<MetadataResolver>,
    pub aggregator: NftAggregator,
    pub synchronizer: CollectionSynchronizer,
    pub minter: MintOrchestrator,
    pub creator: CreationPipeline,
    pub payer: Arc<Keypair>,
}

impl AppState {
    /// Create application state from configuration, loading the payer
    /// keypair from the environment or the configured file.
    pub fn new(config: Config) -> Result<Self, crate::Error> {
        let payer = load_payer(&config)?;
        Self::with_payer(config, payer)
    }

    /// Create application state around an already-loaded payer keypair.
    pub fn with_payer(config: Config, payer: Keypair) -> Result<Self, crate::Error> {
        let payer = Arc::new(payer);
        info!(payer = %payer.pubkey(), "loaded payer keypair");

        let chain = Arc::new(ChainClient::new(&config.rpc_url));
        let ipfs = Arc::new(IpfsClient::new(&config)?);
        let indexer = Arc::new(IndexerClient::new(&config)?);
        let backend = Arc::new(BackendClient::new(&config)?);
        let resolver = Arc::new(MetadataResolver::new(ipfs.clone())?);

        let aggregator = NftAggregator::new(indexer.clone(), chain.clone(), resolver.clone());
        let synchronizer =
            CollectionSynchronizer::new(backend.clone(), indexer.clone(), resolver.clone());
        let minter = MintOrchestrator::new(
            chain.clone(),
            backend.clone(),
            resolver.clone(),
            payer.clone(),
            &config.platform_fee_address,
        )?;
        let creator = CreationPipeline::new(
            chain.clone(),
            ipfs.clone(),
            backend.clone(),
            payer.clone(),
        );

        Ok(Self {
            config,
            chain,
            ipfs,
            indexer,
            backend,
            resolver,
            aggregator,
            synchronizer,
            minter,
            creator,
            payer,
        })
    }
}

/// Load the payer keypair from the DROPS_KEYPAIR_JSON env var first (a JSON
/// byte array, the id.json format inline), then from the configured file.
fn load_payer(config: &Config) -> Result<Keypair, crate::Error> {
    if let Ok(json) = std::env::var("DROPS_KEYPAIR_JSON") {
        return payer_from_json(&json);
    }
    read_keypair_file(&config.keypair_path).map_err(|e| {
        crate::Error::Config(format!(
            "failed to load keypair from {}: {e}",
            config.keypair_path
        ))
    })
}

/// Parse an inline keypair in the id.json format: a JSON array of 64 bytes.
fn payer_from_json(json: &str) -> Result<Keypair, crate::Error> {
    let bytes: Vec<u8> = serde_json::from_str(json)
        .map_err(|e| crate::Error::Config(format!("invalid keypair JSON: {e}")))?;
    Keypair::try_from(bytes.as_slice())
        .map_err(|e| crate::Error::Config(format!("invalid keypair bytes: {e}")))
}
