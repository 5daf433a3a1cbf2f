//! Direct Solana RPC access: owned-token enumeration, token-metadata
//! account decoding, and transaction submission with bounded confirmation
//! retries.
//!
//! Metadata accounts are decoded with the token-metadata program's borsh
//! schema rather than positional byte scanning; the on-chain strings are
//! zero-padded to fixed widths and trimmed here.

use crate::error::Error;
use mpl_token_metadata::accounts::Metadata;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Decoded on-chain token-metadata record for one mint.
#[derive(Debug, Clone)]
pub struct OnChainMetadata {
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
}

/// Thin wrapper around the Solana JSON-RPC client.
pub struct ChainClient {
    rpc: RpcClient,
    url: String,
}

impl ChainClient {
    pub fn new(url: &str) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(url.to_string(), CommitmentConfig::confirmed()),
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Enumerate mints of SPL token accounts owned by `owner` holding a
    /// balance of exactly 1 (the NFT heuristic).
    pub async fn owned_nft_mints(&self, owner: &Pubkey) -> Result<Vec<Pubkey>, Error> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize(spl_token::state::Account::LEN as u64),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(32, owner.as_ref())),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        let accounts = self
            .rpc
            .get_program_accounts_with_config(&spl_token::id(), config)
            .await
            .map_err(|e| Error::Rpc(format!("token account query for {owner}: {e}")))?;

        let mints: Vec<Pubkey> = accounts
            .into_iter()
            .filter_map(|(_, account)| {
                let token = spl_token::state::Account::unpack(&account.data).ok()?;
                (token.amount == 1).then_some(token.mint)
            })
            .collect();
        debug!(owner = %owner, count = mints.len(), "enumerated candidate NFT mints");
        Ok(mints)
    }

    /// Fetch and decode the token-metadata account derived from `mint`.
    pub async fn token_metadata(&self, mint: &Pubkey) -> Result<OnChainMetadata, Error> {
        let (pda, _) = Metadata::find_pda(mint);
        let account = self
            .rpc
            .get_account(&pda)
            .await
            .map_err(|e| Error::Rpc(format!("metadata account for {mint}: {e}")))?;
        let metadata = Metadata::safe_deserialize(&account.data)
            .map_err(|e| Error::Rpc(format!("metadata decode for {mint}: {e}")))?;
        Ok(OnChainMetadata {
            mint: *mint,
            name: trim_padding(&metadata.name),
            symbol: trim_padding(&metadata.symbol),
            uri: trim_padding(&metadata.uri),
            seller_fee_basis_points: metadata.seller_fee_basis_points,
        })
    }

    pub async fn latest_blockhash(&self) -> Result<Hash, Error> {
        self.rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::Rpc(format!("blockhash query: {e}")))
    }

    /// Submit a signed transaction without waiting for confirmation.
    pub async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, Error> {
        self.rpc
            .send_transaction(tx)
            .await
            .map_err(|e| Error::Transaction(format!("submit failed: {e}")))
    }

    /// Submit and wait for confirmation at the client's commitment.
    pub async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature, Error> {
        self.rpc
            .send_and_confirm_transaction(tx)
            .await
            .map_err(|e| Error::Transaction(format!("submit/confirm failed: {e}")))
    }

    /// Poll for confirmation with a fixed delay between attempts. Fails
    /// after `max_attempts`; the delay is not exponential.
    pub async fn confirm_with_retries(
        &self,
        signature: &Signature,
        max_attempts: u32,
        delay: Duration,
    ) -> Result<(), Error> {
        for attempt in 1..=max_attempts {
            match self.rpc.confirm_transaction(signature).await {
                Ok(true) => {
                    info!(%signature, attempt, "transaction confirmed");
                    return Ok(());
                }
                Ok(false) => debug!(%signature, attempt, "not yet confirmed"),
                Err(e) => warn!(%signature, attempt, error = %e, "confirmation attempt failed"),
            }
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }
        Err(Error::Transaction(format!(
            "transaction {signature} not confirmed after {max_attempts} attempts"
        )))
    }
}

/// Strip the zero padding the token-metadata program stores in its
/// fixed-width string fields.
pub fn trim_padding(s: &str) -> String {
    s.trim_end_matches('\0').to_string()
}
