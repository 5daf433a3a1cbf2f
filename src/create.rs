//! Collection creation pipeline: a multi-phase sequence that uploads
//! content, registers the collection on-chain, and persists the record.
//!
//! Phase order is fixed: inputs are validated before any I/O, all content
//! uploads complete before the transaction is built, and the backend write
//! comes last. A failure in phases 1-4 aborts the pipeline; a phase-5
//! backend failure is logged and the created collection is still returned,
//! since the chain registration already succeeded.

use crate::backend::BackendClient;
use crate::chain::ChainClient;
use crate::error::Error;
use crate::ipfs::IpfsClient;
use crate::model::{now_iso, Collection};
use crate::progress::Progress;
use futures::future::join_all;
use mpl_token_metadata::accounts::{MasterEdition, Metadata};
use mpl_token_metadata::instructions::{CreateV1Builder, MintV1Builder};
use mpl_token_metadata::types::{CollectionDetails, Creator, PrintSupply, TokenStandard};
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Item images uploaded concurrently per batch; batches run sequentially.
pub const UPLOAD_BATCH_SIZE: usize = 10;

/// Confirmation polling after the create transaction is submitted.
pub const CONFIRM_MAX_ATTEMPTS: u32 = 5;
pub const CONFIRM_RETRY_DELAY: Duration = Duration::from_secs(2);

/// One item image to pin.
#[derive(Clone)]
pub struct ItemImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Inputs to the creation pipeline.
pub struct CreateCollectionRequest {
    pub name: String,
    pub symbol: String,
    pub description: String,
    /// Mint price in SOL.
    pub mint_price: f64,
    pub max_supply: u32,
    /// Royalty on secondary sales, percent (0..=50).
    pub royalty_percentage: u8,
    pub collection_image: ItemImage,
    pub item_images: Vec<ItemImage>,
}

impl CreateCollectionRequest {
    /// Full input validation, run before any upload or chain call.
    fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() || self.symbol.trim().is_empty() {
            return Err(Error::Validation("name and symbol are required".into()));
        }
        if self.mint_price <= 0.0 {
            return Err(Error::Validation("mint price must be positive".into()));
        }
        if self.max_supply == 0 {
            return Err(Error::Validation("max supply must be positive".into()));
        }
        if self.royalty_percentage > 50 {
            return Err(Error::Validation(
                "royalty percentage must be between 0 and 50".into(),
            ));
        }
        if self.collection_image.bytes.is_empty() {
            return Err(Error::Validation("collection image is required".into()));
        }
        if self.item_images.len() > self.max_supply as usize {
            return Err(Error::Validation(format!(
                "{} item images exceed max supply {}",
                self.item_images.len(),
                self.max_supply
            )));
        }
        Ok(())
    }
}

/// Runs the creation sequence end to end.
pub struct CreationPipeline {
    chain: Arc<ChainClient>,
    ipfs: Arc<IpfsClient>,
    backend: Arc<BackendClient>,
    payer: Arc<Keypair>,
}

impl CreationPipeline {
    pub fn new(
        chain: Arc<ChainClient>,
        ipfs: Arc<IpfsClient>,
        backend: Arc<BackendClient>,
        payer: Arc<Keypair>,
    ) -> Self {
        Self {
            chain,
            ipfs,
            backend,
            payer,
        }
    }

    /// Create a collection. Returns the collection record as persisted (or
    /// as it should have been persisted, when the backend write fails).
    pub async fn create(
        &self,
        request: CreateCollectionRequest,
        progress: &Progress,
    ) -> Result<Collection, Error> {
        // Phase 1: validation, before anything leaves the process.
        progress.report(0, "Validating collection details...");
        request.validate()?;

        let collection_mint = Keypair::new();
        let creator = self.payer.pubkey();

        // Phase 2: pin the collection image.
        progress.report(10, "Uploading collection image...");
        let image_url = self
            .ipfs
            .upload_file(
                request.collection_image.bytes.clone(),
                &format!("{}-collection", request.symbol),
                &request.collection_image.content_type,
            )
            .await?;

        // Phase 3: pin item images and their metadata documents, batched.
        progress.report(30, "Uploading NFT images and metadata...");
        let item_image_urls = self.upload_item_images(&request).await?;
        let nft_metadata_uris = self
            .upload_item_metadata(&request, &collection_mint.pubkey().to_string(), &item_image_urls)
            .await?;

        // Collection-level document last, so it can embed the full item list.
        let collection_doc = build_collection_metadata(
            &request,
            &image_url,
            &creator.to_string(),
            &nft_metadata_uris,
        );
        let collection_metadata_uri = self
            .ipfs
            .upload_json(&collection_doc, &format!("{}-metadata", request.symbol))
            .await?;

        // Phase 4: register the collection on-chain and wait for finality.
        progress.report(60, "Creating collection on-chain...");
        let recent_blockhash = self.chain.latest_blockhash().await?;
        let tx = self.build_create_transaction(
            &collection_mint,
            &request,
            &collection_metadata_uri,
            recent_blockhash,
        );
        let signature = self.chain.send_transaction(&tx).await?;

        progress.report(80, "Confirming transaction...");
        self.chain
            .confirm_with_retries(&signature, CONFIRM_MAX_ATTEMPTS, CONFIRM_RETRY_DELAY)
            .await?;
        info!(
            collection_mint = %collection_mint.pubkey(),
            %signature,
            "collection registered on-chain"
        );

        let collection = Collection {
            collection_mint: collection_mint.pubkey().to_string(),
            name: request.name.clone(),
            symbol: request.symbol.clone(),
            description: request.description.clone(),
            creator_address: creator.to_string(),
            mint_price: request.mint_price,
            max_supply: request.max_supply,
            royalty_percentage: request.royalty_percentage,
            created_at: now_iso(),
            collection_metadata_uri,
            image: Some(image_url),
            nft_metadata_uris,
            minted_nfts: Vec::new(),
        };

        // Phase 5: persist. The chain registration is already final, so a
        // backend failure is logged and the collection returned anyway; the
        // synchronizer reconciles the record later.
        progress.report(90, "Saving collection...");
        if let Err(e) = self.backend.create_collection(&collection).await {
            error!(
                collection_mint = %collection.collection_mint,
                error = %e,
                "collection created on-chain but backend persist failed"
            );
        }

        progress.report(100, "Collection created successfully!");
        Ok(collection)
    }

    async fn upload_item_images(
        &self,
        request: &CreateCollectionRequest,
    ) -> Result<Vec<String>, Error> {
        let mut urls = Vec::with_capacity(request.item_images.len());
        for (chunk_index, chunk) in request.item_images.chunks(UPLOAD_BATCH_SIZE).enumerate() {
            let start = chunk_index * UPLOAD_BATCH_SIZE;
            let batch = join_all(chunk.iter().enumerate().map(|(i, image)| {
                let name = format!("{}-item-{}", request.symbol, start + i + 1);
                async move {
                    self.ipfs
                        .upload_file(image.bytes.clone(), &name, &image.content_type)
                        .await
                }
            }))
            .await;
            for url in batch {
                urls.push(url?);
            }
        }
        Ok(urls)
    }

    async fn upload_item_metadata(
        &self,
        request: &CreateCollectionRequest,
        collection_mint: &str,
        item_image_urls: &[String],
    ) -> Result<Vec<String>, Error> {
        let creator = self.payer.pubkey().to_string();
        let mut uris = Vec::with_capacity(item_image_urls.len());
        for (chunk_index, chunk) in item_image_urls.chunks(UPLOAD_BATCH_SIZE).enumerate() {
            let start = chunk_index * UPLOAD_BATCH_SIZE;
            let batch = join_all(chunk.iter().enumerate().map(|(i, image_url)| {
                let index = start + i;
                let doc =
                    build_item_metadata(request, collection_mint, &creator, image_url, index);
                async move {
                    self.ipfs
                        .upload_json(&doc, &format!("{}-item-{}-metadata", request.symbol, index + 1))
                        .await
                }
            }))
            .await;
            for uri in batch {
                uris.push(uri?);
            }
        }
        Ok(uris)
    }

    /// Assemble the create+mint transaction for the collection NFT itself,
    /// flagged as a sized collection parent.
    pub fn build_create_transaction(
        &self,
        collection_mint: &Keypair,
        request: &CreateCollectionRequest,
        metadata_uri: &str,
        recent_blockhash: Hash,
    ) -> Transaction {
        let payer = self.payer.pubkey();
        let mint = collection_mint.pubkey();
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
            .name(request.name.clone())
            .symbol(request.symbol.clone())
            .uri(metadata_uri.to_string())
            .seller_fee_basis_points(request.royalty_percentage as u16 * 100)
            .creators(vec![Creator {
                address: payer,
                verified: true,
                share: 100,
            }])
            .collection_details(CollectionDetails::V1 { size: 0 })
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

        Transaction::new_signed_with_payer(
            &[create_ix, mint_ix],
            Some(&payer),
            &[self.payer.as_ref(), collection_mint],
            recent_blockhash,
        )
    }
}

/// Collection-level metadata document. Carries the full item URI list so
/// chain state alone can rebuild the collection view.
pub fn build_collection_metadata(
    request: &CreateCollectionRequest,
    image_url: &str,
    creator_address: &str,
    nft_metadata_uris: &[String],
) -> Value {
    json!({
        "name": request.name,
        "symbol": request.symbol,
        "description": request.description,
        "image": image_url,
        "seller_fee_basis_points": request.royalty_percentage as u16 * 100,
        "attributes": [
            { "trait_type": "Collection", "value": "true" },
            { "trait_type": "Max Supply", "value": request.max_supply.to_string() },
        ],
        "properties": {
            "files": [{ "uri": image_url, "type": request.collection_image.content_type }],
            "category": "image",
            "creators": [{ "address": creator_address, "share": 100 }],
            "maxSupply": request.max_supply,
            "mintPrice": request.mint_price,
            "isCollection": true,
            "nftMetadataUris": nft_metadata_uris,
        },
    })
}

/// Per-item metadata document, numbered from 1 and carrying a back-reference
/// to its parent collection.
pub fn build_item_metadata(
    request: &CreateCollectionRequest,
    collection_mint: &str,
    creator_address: &str,
    image_url: &str,
    index: usize,
) -> Value {
    json!({
        "name": format!("{} #{}", request.name, index + 1),
        "symbol": request.symbol,
        "description": request.description,
        "image": image_url,
        "attributes": [
            { "trait_type": "Number", "value": index + 1 },
        ],
        "properties": {
            "files": [{ "uri": image_url, "type": request.item_images.get(index).map(|i| i.content_type.as_str()).unwrap_or("image/png") }],
            "category": "image",
            "creators": [{ "address": creator_address, "share": 100 }],
        },
        "collection": {
            "name": request.name,
            "family": request.symbol,
            "mint": collection_mint,
        },
    })
}
