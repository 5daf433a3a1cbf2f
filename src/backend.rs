//! Persistence backend client.
//!
//! The backend is a thin CRUD layer over collection and auction records.
//! Its collection view is denormalized and advisory; chain state stays
//! canonical, so callers tolerate it lagging behind.

use crate::config::Config;
use crate::error::Error;
use crate::model::{AuctionListing, Collection, MintedItem};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the collection/auction CRUD API.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    /// Persist a freshly created collection record.
    pub async fn create_collection(&self, collection: &Collection) -> Result<Collection, Error> {
        collection.validate()?;
        let body = self
            .post("/nft/create", &serde_json::to_value(collection).unwrap_or_default())
            .await?;
        let record = body.get("collection").cloned().unwrap_or(body);
        serde_json::from_value(record)
            .map_err(|e| Error::Backend(format!("create response decode: {e}")))
    }

    /// All known collections. An empty store answers 404, which maps to an
    /// empty list rather than an error.
    pub async fn all_collections(&self) -> Result<Vec<Collection>, Error> {
        self.collection_list("/nft/all", json!({})).await
    }

    /// Collections created by `creator_address`. 404 maps to empty.
    pub async fn collections_by_owner(&self, creator_address: &str) -> Result<Vec<Collection>, Error> {
        self.collection_list("/nft/by-owner", json!({ "creatorAddress": creator_address }))
            .await
    }

    /// Look up one collection by its mint address.
    pub async fn collection_by_mint(&self, collection_mint: &str) -> Result<Collection, Error> {
        let body = self
            .post("/nft/single", &json!({ "collectionMint": collection_mint }))
            .await?;
        let record = body
            .get("collection")
            .cloned()
            .ok_or_else(|| Error::Backend("single response missing collection".into()))?;
        serde_json::from_value(record)
            .map_err(|e| Error::Backend(format!("single response decode: {e}")))
    }

    /// Append minted items to a collection record. The backend pushes each
    /// entry onto the stored array; it never replaces it.
    pub async fn append_minted(
        &self,
        collection_mint: &str,
        items: &[MintedItem],
    ) -> Result<(), Error> {
        let url = format!("{}/nft/update", self.base_url);
        let resp = self
            .http
            .patch(&url)
            .header("Accept", "application/json")
            .json(&json!({
                "collectionMint": collection_mint,
                "mintedNfts": items,
            }))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("PATCH {url}: {e}")))?;
        self.check_status(resp, &url).await.map(|_| ())
    }

    // --- Auction sub-resource ---

    /// All listings, newest first (the backend sorts).
    pub async fn auctions(&self) -> Result<Vec<AuctionListing>, Error> {
        let body = self.post("/auction/fetch", &json!({})).await?;
        let list = body
            .get("auctions")
            .cloned()
            .unwrap_or_else(|| json!([]));
        serde_json::from_value(list)
            .map_err(|e| Error::Backend(format!("auction list decode: {e}")))
    }

    /// Create a listing. The backend rejects a duplicate mint with 409,
    /// surfaced as a validation error.
    pub async fn add_auction(&self, listing: &AuctionListing) -> Result<(), Error> {
        let url = format!("{}/auction/add", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(listing)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("POST {url}: {e}")))?;
        if resp.status() == reqwest::StatusCode::CONFLICT {
            return Err(Error::Validation(format!(
                "listing for {} already exists",
                listing.mint
            )));
        }
        self.check_status(resp, &url).await.map(|_| ())
    }

    /// Cancel a listing by mint address.
    pub async fn remove_auction(&self, mint: &str) -> Result<(), Error> {
        let url = format!("{}/auction/remove", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&json!({ "mint": mint }))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("POST {url}: {e}")))?;
        self.check_status(resp, &url).await.map(|_| ())
    }

    // --- Helpers ---

    async fn collection_list(&self, path: &str, body: Value) -> Result<Vec<Collection>, Error> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("POST {url}: {e}")))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(url, "backend has no matching collections");
            return Ok(Vec::new());
        }
        let body = self.check_status(resp, &url).await?;
        let list = body
            .get("collections")
            .cloned()
            .unwrap_or_else(|| json!([]));
        serde_json::from_value(list)
            .map_err(|e| Error::Backend(format!("collection list decode: {e}")))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, Error> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("POST {url}: {e}")))?;
        self.check_status(resp, &url).await
    }

    async fn check_status(&self, resp: reqwest::Response, url: &str) -> Result<Value, Error> {
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("{url}: record not found")));
        }
        if !status.is_success() {
            return Err(Error::Backend(format!("{url}: HTTP {status}")));
        }
        resp.json()
            .await
            .map_err(|e| Error::Backend(format!("decode {url}: {e}")))
    }
}
