//! Metadata resolver: fetches and parses item metadata documents.
//!
//! Resolution never fails the caller. A fetch or parse error degrades to a
//! deterministic placeholder keyed by the item's positional index so list
//! views stay stable.

use crate::error::Error;
use crate::ipfs::IpfsClient;
use crate::model::{NftAttribute, ResolvedMetadata, PLACEHOLDER_IMAGE};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Items resolved concurrently per batch; batches run sequentially.
pub const RESOLVE_BATCH_SIZE: usize = 5;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Never-failing metadata document resolver.
pub struct MetadataResolver {
    http: reqwest::Client,
    ipfs: Arc<IpfsClient>,
}

impl MetadataResolver {
    pub fn new(ipfs: Arc<IpfsClient>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self { http, ipfs })
    }

    /// Fetch and parse one metadata document. Single attempt, no retry;
    /// any failure yields the placeholder for `index`.
    pub async fn resolve(&self, uri: &str, index: usize) -> ResolvedMetadata {
        match self.fetch_document(uri).await {
            Ok(doc) => {
                let name = doc
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|n| !n.is_empty())
                    .map(String::from)
                    .unwrap_or_else(|| format!("NFT #{}", index + 1));
                let image = doc
                    .get("image")
                    .and_then(Value::as_str)
                    .filter(|i| !i.is_empty())
                    .map(|i| self.ipfs.to_gateway_url(i))
                    .unwrap_or_else(|| PLACEHOLDER_IMAGE.into());
                let attributes = doc
                    .get("attributes")
                    .cloned()
                    .and_then(|a| serde_json::from_value::<Vec<NftAttribute>>(a).ok())
                    .unwrap_or_default();
                ResolvedMetadata {
                    id: format!("item-{}", index + 1),
                    name,
                    image,
                    attributes,
                }
            }
            Err(e) => {
                warn!(uri, index, error = %e, "metadata resolution failed, using placeholder");
                ResolvedMetadata::placeholder(index)
            }
        }
    }

    /// The gateway client used for URI rewriting.
    pub fn ipfs(&self) -> &IpfsClient {
        &self.ipfs
    }

    /// Fetch a raw metadata document through the gateway rewrite.
    pub async fn fetch_document(&self, uri: &str) -> Result<Value, Error> {
        let url = self.ipfs.to_gateway_url(uri);
        if url.is_empty() {
            return Err(Error::Validation("empty metadata URI".into()));
        }
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Ipfs(format!("fetch {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Ipfs(format!("fetch {url}: HTTP {status}")));
        }
        resp.json()
            .await
            .map_err(|e| Error::Ipfs(format!("parse {url}: {e}")))
    }

    /// Resolve a URI sequence in fixed-size batches.
    ///
    /// Items within a batch resolve concurrently but are reassembled in
    /// submission order before `on_batch` sees them; batches run strictly
    /// one after another with a micro-yield in between so the host stays
    /// responsive.
    pub async fn resolve_batch<F>(&self, uris: &[String], mut on_batch: F) -> Vec<ResolvedMetadata>
    where
        F: FnMut(&[ResolvedMetadata]),
    {
        let mut all = Vec::with_capacity(uris.len());
        for (chunk_index, chunk) in uris.chunks(RESOLVE_BATCH_SIZE).enumerate() {
            let start = chunk_index * RESOLVE_BATCH_SIZE;
            // join_all preserves submission order regardless of completion order
            let results = join_all(
                chunk
                    .iter()
                    .enumerate()
                    .map(|(i, uri)| self.resolve(uri, start + i)),
            )
            .await;
            on_batch(&results);
            all.extend(results);
            tokio::task::yield_now().await;
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn resolver() -> MetadataResolver {
        let ipfs = Arc::new(IpfsClient::new(&Config::default()).unwrap());
        MetadataResolver::new(ipfs).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_unreachable_host_yields_placeholder() {
        let r = resolver();
        // Nothing listens on port 9; the connection fails immediately.
        let m = r.resolve("http://127.0.0.1:9/meta.json", 2).await;
        assert_eq!(m.name, "NFT #3");
        assert_eq!(m.image, PLACEHOLDER_IMAGE);
        assert!(m.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_empty_uri_yields_placeholder() {
        let m = resolver().resolve("", 0).await;
        assert_eq!(m.name, "NFT #1");
        assert!(!m.image.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_batch_preserves_order_on_failures() {
        let r = resolver();
        let uris: Vec<String> = (0..6)
            .map(|i| format!("http://127.0.0.1:9/item-{i}.json"))
            .collect();
        let mut batch_sizes = Vec::new();
        let results = r
            .resolve_batch(&uris, |batch| batch_sizes.push(batch.len()))
            .await;
        assert_eq!(results.len(), 6);
        assert_eq!(batch_sizes, vec![5, 1]);
        for (i, m) in results.iter().enumerate() {
            assert_eq!(m.id, format!("item-{}", i + 1));
        }
    }
}
