//! Mint orchestrator: drives one mint as a single atomic transaction
//! bundling token creation, the platform fee, and the creator payment.

use crate::backend::BackendClient;
use crate::chain::ChainClient;
use crate::error::Error;
use crate::metadata::MetadataResolver;
use crate::model::{now_iso, Collection, MintedItem};
use crate::progress::Progress;
use mpl_token_metadata::accounts::{MasterEdition, Metadata};
use mpl_token_metadata::instructions::{CreateV1Builder, MintV1Builder};
use mpl_token_metadata::types::{Creator, PrintSupply, TokenStandard};
use solana_sdk::hash::Hash;
use solana_sdk::native_token::{lamports_to_sol, sol_to_lamports};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;
use tracing::{error, info};

/// Platform fee charged on top of the mint price, percent.
pub const PLATFORM_FEE_PERCENT: u64 = 8;

/// Outcome of one successful mint.
#[derive(Debug, Clone)]
pub struct MintResult {
    pub nft_mint: String,
    pub signature: String,
    /// Platform fee paid, SOL.
    pub platform_fee: f64,
    /// Creator payment, SOL (the full mint price; the fee is additive).
    pub creator_payment: f64,
    pub item: MintedItem,
}

/// Drives the multi-party mint operation.
pub struct MintOrchestrator {
    chain: Arc<ChainClient>,
    backend: Arc<BackendClient>,
    resolver: Arc<MetadataResolver>,
    payer: Arc<Keypair>,
    fee_address: Pubkey,
}

impl MintOrchestrator {
    pub fn new(
        chain: Arc<ChainClient>,
        backend: Arc<BackendClient>,
        resolver: Arc<MetadataResolver>,
        payer: Arc<Keypair>,
        platform_fee_address: &str,
    ) -> Result<Self, Error> {
        let fee_address = platform_fee_address
            .parse()
            .map_err(|e| Error::Config(format!("invalid platform fee address: {e}")))?;
        Ok(Self {
            chain,
            backend,
            resolver,
            payer,
            fee_address,
        })
    }

    /// Mint the item at `item_index` from `collection`.
    ///
    /// Token creation, platform fee, and creator payment travel in one
    /// transaction; the chain's atomicity guarantees all-or-nothing. On
    /// success the minted item is appended locally and pushed to the
    /// backend fire-and-forget; a failed backend push is logged and never
    /// rolls back the mint. On transaction failure nothing is recorded and
    /// the caller retries from the start.
    pub async fn mint(
        &self,
        collection: &mut Collection,
        item_index: u32,
        progress: &Progress,
    ) -> Result<MintResult, Error> {
        progress.report(0, "Initializing mint process...");

        let metadata_uri = collection
            .nft_metadata_uris
            .get(item_index as usize)
            .cloned()
            .ok_or_else(|| {
                Error::Validation(format!(
                    "item index {item_index} out of range ({} items)",
                    collection.nft_metadata_uris.len()
                ))
            })?;
        if collection.is_minted(item_index) {
            return Err(Error::Validation(format!(
                "item {item_index} already minted"
            )));
        }
        if collection.minted_nfts.len() >= collection.max_supply as usize {
            return Err(Error::Validation(format!(
                "collection {} is fully minted",
                collection.collection_mint
            )));
        }

        let name = self.item_name(&metadata_uri).await;
        progress.report(30, "Creating NFT and preparing payments...");

        let nft_mint = Keypair::new();
        let recent_blockhash = self.chain.latest_blockhash().await?;
        let tx = self.build_mint_transaction(
            &nft_mint,
            collection,
            &name,
            &metadata_uri,
            recent_blockhash,
        )?;

        progress.report(60, "Signing and sending transaction...");
        let signature = self.chain.send_and_confirm(&tx).await?;
        info!(
            nft_mint = %nft_mint.pubkey(),
            collection = %collection.collection_mint,
            %signature,
            "mint transaction confirmed"
        );

        let item = MintedItem {
            nft_mint: nft_mint.pubkey().to_string(),
            nft_index: item_index,
            nft_metadata_uri: metadata_uri,
            minted_at: now_iso(),
        };
        collection.append_minted(item.clone())?;

        // Backend sync is at-least-once and fire-and-forget: the mint is
        // final once the chain confirms, and the synchronizer papers over
        // any gap on the next read.
        let backend = self.backend.clone();
        let collection_mint = collection.collection_mint.clone();
        let items = vec![item.clone()];
        tokio::spawn(async move {
            if let Err(e) = backend.append_minted(&collection_mint, &items).await {
                error!(collection = %collection_mint, error = %e, "failed to record mint in backend");
            }
        });

        progress.report(100, "Mint completed successfully!");

        let price_lamports = sol_to_lamports(collection.mint_price);
        Ok(MintResult {
            nft_mint: item.nft_mint.clone(),
            signature: signature.to_string(),
            platform_fee: lamports_to_sol(platform_fee_lamports(price_lamports)),
            creator_payment: collection.mint_price,
            item,
        })
    }

    /// Assemble the atomic transaction: create+mint instructions for the
    /// new token (referencing the collection, unverified), then the fee and
    /// creator transfers.
    pub fn build_mint_transaction(
        &self,
        nft_mint: &Keypair,
        collection: &Collection,
        name: &str,
        metadata_uri: &str,
        recent_blockhash: Hash,
    ) -> Result<Transaction, Error> {
        let payer = self.payer.pubkey();
        let mint = nft_mint.pubkey();
        let collection_key: Pubkey = collection
            .collection_mint
            .parse()
            .map_err(|e| Error::Validation(format!("invalid collection mint: {e}")))?;
        let creator: Pubkey = collection
            .creator_address
            .parse()
            .map_err(|e| Error::Validation(format!("invalid creator address: {e}")))?;

        let (metadata_pda, _) = Metadata::find_pda(&mint);
        let (edition_pda, _) = MasterEdition::find_pda(&mint);

        let create_ix = CreateV1Builder::new()
            .metadata(metadata_pda)
            .master_edition(Some(edition_pda))
            .mint(mint, true)
            .authority(payer)
            .payer(payer)
            .update_authority(payer, true)
            .is_mutable(true)
            .primary_sale_happened(false)
            .name(name.to_string())
            .symbol(collection.symbol.clone())
            .uri(metadata_uri.to_string())
            .seller_fee_basis_points(collection.royalty_percentage as u16 * 100)
            .creators(vec![Creator {
                address: payer,
                verified: true,
                share: 100,
            }])
            .collection(mpl_token_metadata::types::Collection {
                verified: false,
                key: collection_key,
            })
            .token_standard(TokenStandard::NonFungible)
            .print_supply(PrintSupply::Zero)
            .instruction();

        let token = get_associated_token_address(&payer, &mint);
        let mint_ix = MintV1Builder::new()
            .token(token)
            .token_owner(Some(payer))
            .metadata(metadata_pda)
            .master_edition(Some(edition_pda))
            .mint(mint)
            .authority(payer)
            .payer(payer)
            .amount(1)
            .instruction();

        let price_lamports = sol_to_lamports(collection.mint_price);
        let fee_ix =
            system_instruction::transfer(&payer, &self.fee_address, platform_fee_lamports(price_lamports));
        let pay_ix = system_instruction::transfer(&payer, &creator, price_lamports);

        Ok(Transaction::new_signed_with_payer(
            &[create_ix, mint_ix, fee_ix, pay_ix],
            Some(&payer),
            &[self.payer.as_ref(), nft_mint],
            recent_blockhash,
        ))
    }

    /// Display name from the item's metadata document, tolerating fetch
    /// failure with a fixed fallback.
    async fn item_name(&self, metadata_uri: &str) -> String {
        match self.resolver.fetch_document(metadata_uri).await {
            Ok(doc) => doc
                .get("name")
                .and_then(serde_json::Value::as_str)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .unwrap_or_else(|| "Unnamed NFT".into()),
            Err(_) => "Unnamed NFT".into(),
        }
    }
}

/// Fee lamports for a given price: a fixed percentage, additive on top of
/// the creator payment rather than deducted from it.
pub fn platform_fee_lamports(price_lamports: u64) -> u64 {
    price_lamports * PLATFORM_FEE_PERCENT / 100
}
