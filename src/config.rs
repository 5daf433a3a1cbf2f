//! Drops client configuration.

use serde::Deserialize;

/// Configuration for the drops client.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Solana JSON-RPC endpoint.
    #[serde(default = "defaults::rpc_url")]
    pub rpc_url: String,

    /// Collection/auction persistence backend base URL.
    #[serde(default = "defaults::backend_url")]
    pub backend_url: String,

    /// Primary NFT indexer base URL (Moralis-compatible Solana gateway).
    #[serde(default = "defaults::indexer_url")]
    pub indexer_url: String,

    #[serde(default = "defaults::indexer_api_key")]
    pub indexer_api_key: String,

    /// Solana network name as used in indexer paths ("mainnet" / "devnet").
    #[serde(default = "defaults::network")]
    pub network: String,

    /// Pinning API base URL.
    #[serde(default = "defaults::pinning_api_url")]
    pub pinning_api_url: String,

    #[serde(default = "defaults::pinning_jwt")]
    pub pinning_jwt: String,

    /// Gateway base for rewriting content-addressed URIs into fetchable URLs.
    #[serde(default = "defaults::ipfs_gateway")]
    pub ipfs_gateway: String,

    /// Wallet receiving the platform fee on every mint.
    #[serde(default = "defaults::platform_fee_address")]
    pub platform_fee_address: String,

    /// Path to the payer keypair file (id.json format).
    #[serde(default = "defaults::keypair_path")]
    pub keypair_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: defaults::rpc_url(),
            backend_url: defaults::backend_url(),
            indexer_url: defaults::indexer_url(),
            indexer_api_key: defaults::indexer_api_key(),
            network: defaults::network(),
            pinning_api_url: defaults::pinning_api_url(),
            pinning_jwt: defaults::pinning_jwt(),
            ipfs_gateway: defaults::ipfs_gateway(),
            platform_fee_address: defaults::platform_fee_address(),
            keypair_path: defaults::keypair_path(),
        }
    }
}

mod defaults {
    fn env_or(key: &str, fallback: &str) -> String {
        match std::env::var(key) {
            Ok(v) if !v.is_empty() => v,
            _ => fallback.into(),
        }
    }

    pub fn rpc_url() -> String {
        env_or("DROPS_RPC_URL", "https://api.mainnet-beta.solana.com")
    }

    pub fn backend_url() -> String {
        env_or("DROPS_BACKEND_URL", "http://127.0.0.1:3031")
    }

    pub fn indexer_url() -> String {
        env_or("DROPS_INDEXER_URL", "https://solana-gateway.moralis.io")
    }

    pub fn indexer_api_key() -> String {
        env_or("DROPS_INDEXER_API_KEY", "")
    }

    pub fn network() -> String {
        env_or("DROPS_NETWORK", "mainnet")
    }

    pub fn pinning_api_url() -> String {
        env_or("DROPS_PINNING_API_URL", "https://api.pinata.cloud/pinning")
    }

    pub fn pinning_jwt() -> String {
        env_or("DROPS_PINNING_JWT", "")
    }

    pub fn ipfs_gateway() -> String {
        env_or("DROPS_IPFS_GATEWAY", "https://gateway.pinata.cloud/ipfs")
    }

    pub fn platform_fee_address() -> String {
        env_or(
            "DROPS_PLATFORM_FEE_ADDRESS",
            "J5zeD8EDjbJDARaMPQWR2QjvSZ1SoSQuj6BYf973EUZS",
        )
    }

    pub fn keypair_path() -> String {
        env_or("DROPS_KEYPAIR_PATH", "./payer.json")
    }
}
