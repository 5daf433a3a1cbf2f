//! Content storage client: pinning API uploads and gateway URI rewriting.
//!
//! Uploads go through a Pinata-style pinning API (`pinFileToIPFS` /
//! `pinJSONToIPFS`); both return a gateway-resolvable URL. No deletion or
//! versioning.

use crate::config::Config;
use crate::error::Error;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pinning API + gateway client.
pub struct IpfsClient {
    http: reqwest::Client,
    api_url: String,
    jwt: String,
    gateway: String,
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl IpfsClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            api_url: config.pinning_api_url.trim_end_matches('/').to_string(),
            jwt: config.pinning_jwt.clone(),
            gateway: config.ipfs_gateway.trim_end_matches('/').to_string(),
        })
    }

    /// Rewrite a storage-location identifier into a directly fetchable URL.
    ///
    /// `ipfs://<cid>` and bare 46-character content identifiers become
    /// `<gateway>/<cid>`; HTTP(S) URLs pass through unchanged.
    pub fn to_gateway_url(&self, uri: &str) -> String {
        if uri.is_empty() {
            return String::new();
        }
        if let Some(rest) = uri.strip_prefix("ipfs://") {
            return format!("{}/{}", self.gateway, rest);
        }
        if uri.starts_with("https://") || uri.starts_with("http://") {
            return uri.to_string();
        }
        // Bare CID or any other opaque identifier.
        format!("{}/{}", self.gateway, uri)
    }

    /// Upload raw file bytes, returning a gateway-resolvable URI.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        name: &str,
        content_type: &str,
    ) -> Result<String, Error> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(content_type)
            .map_err(|e| Error::Ipfs(format!("invalid content type: {e}")))?;
        let metadata = json!({
            "name": name,
            "keyvalues": {
                "source": "nft-drops",
                "timestamp": crate::model::now_iso(),
            }
        });
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata.to_string())
            .text("pinataOptions", json!({ "cidVersion": 0 }).to_string());

        let resp = self
            .http
            .post(format!("{}/pinFileToIPFS", self.api_url))
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Ipfs(format!("file upload failed: {e}")))?;
        self.pin_result(resp, name).await
    }

    /// Upload a JSON document, returning a gateway-resolvable URI.
    pub async fn upload_json(
        &self,
        content: &serde_json::Value,
        name: &str,
    ) -> Result<String, Error> {
        let body = json!({
            "pinataOptions": { "cidVersion": 0 },
            "pinataMetadata": {
                "name": name,
                "keyvalues": {
                    "source": "nft-drops",
                    "timestamp": crate::model::now_iso(),
                }
            },
            "pinataContent": content,
        });

        let resp = self
            .http
            .post(format!("{}/pinJSONToIPFS", self.api_url))
            .bearer_auth(&self.jwt)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Ipfs(format!("json upload failed: {e}")))?;
        self.pin_result(resp, name).await
    }

    async fn pin_result(&self, resp: reqwest::Response, name: &str) -> Result<String, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Ipfs(format!("pin request for {name}: HTTP {status}")));
        }
        let pin: PinResponse = resp
            .json()
            .await
            .map_err(|e| Error::Ipfs(format!("pin response for {name}: {e}")))?;
        debug!(name, hash = %pin.ipfs_hash, "pinned content");
        Ok(format!("{}/{}", self.gateway, pin.ipfs_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> IpfsClient {
        let config = Config {
            ipfs_gateway: "https://gateway.pinata.cloud/ipfs".into(),
            ..Config::default()
        };
        IpfsClient::new(&config).unwrap()
    }

    #[test]
    fn test_ipfs_scheme_rewritten() {
        assert_eq!(
            client().to_gateway_url("ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"),
            "https://gateway.pinata.cloud/ipfs/QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
    }

    #[test]
    fn test_bare_cid_rewritten() {
        let cid = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
        assert_eq!(cid.len(), 46);
        assert_eq!(
            client().to_gateway_url(cid),
            format!("https://gateway.pinata.cloud/ipfs/{cid}")
        );
    }

    #[test]
    fn test_http_urls_pass_through() {
        assert_eq!(
            client().to_gateway_url("https://example.com/meta.json"),
            "https://example.com/meta.json"
        );
        assert_eq!(
            client().to_gateway_url("http://example.com/meta.json"),
            "http://example.com/meta.json"
        );
    }

    #[test]
    fn test_empty_uri_stays_empty() {
        assert_eq!(client().to_gateway_url(""), "");
    }
}
