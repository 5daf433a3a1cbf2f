//! Primary NFT data provider: Moralis-compatible Solana gateway REST API.

use crate::config::Config;
use crate::error::Error;
use crate::model::TokenSummary;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the primary indexer.
pub struct IndexerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    network: String,
}

/// One owned-token entry from the account NFT listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnedNft {
    mint: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
}

/// Indexer view of one token's on-chain metadata record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedTokenMetadata {
    pub mint: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub metaplex: Option<MetaplexInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaplexInfo {
    #[serde(default)]
    pub metadata_uri: Option<String>,
    #[serde(default)]
    pub seller_fee_basis_points: Option<u16>,
}

impl IndexerClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: config.indexer_url.trim_end_matches('/').to_string(),
            api_key: config.indexer_api_key.clone(),
            network: config.network.clone(),
        })
    }

    /// List tokens held by `address`. An empty list is a valid answer;
    /// transport and HTTP failures surface as `Error::Indexer`.
    pub async fn nfts_by_owner(&self, address: &str) -> Result<Vec<TokenSummary>, Error> {
        let url = format!(
            "{}/account/{}/{}/nft",
            self.base_url, self.network, address
        );
        let owned: Vec<OwnedNft> = self.get_json(&url).await?;
        debug!(address, count = owned.len(), "indexer returned owned tokens");
        Ok(owned
            .into_iter()
            .map(|n| TokenSummary {
                mint: n.mint,
                name: n.name,
                symbol: n.symbol,
                metadata_uri: String::new(),
                image_url: String::new(),
                metadata: None,
            })
            .collect())
    }

    /// Fetch the indexed on-chain metadata record for one mint.
    pub async fn nft_metadata(&self, mint: &str) -> Result<IndexedTokenMetadata, Error> {
        let url = format!("{}/nft/{}/{}/metadata", self.base_url, self.network, mint);
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        let resp = self
            .http
            .get(url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Indexer(format!("request {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Indexer(format!("request {url}: HTTP {status}")));
        }
        resp.json()
            .await
            .map_err(|e| Error::Indexer(format!("decode {url}: {e}")))
    }
}
