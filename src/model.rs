//! Data model for drop collections and wallet-held tokens.
//!
//! Field names serialize in camelCase to match the persistence backend's
//! JSON records. Required vs optional fields are explicit; anything the
//! backend may omit carries `#[serde(default)]`.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Image substituted when metadata resolution fails or carries no image.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg?height=300&width=300";

/// One NFT drop. Identified by its on-chain collection mint address;
/// the backend record is a denormalized view, chain state is canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub collection_mint: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub creator_address: String,
    /// Mint price in SOL.
    pub mint_price: f64,
    pub max_supply: u32,
    /// Royalty on secondary sales, percent (0..=50).
    pub royalty_percentage: u8,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub collection_metadata_uri: String,
    /// Collection image, already resolved to a fetchable URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Ordered per-item metadata URIs; `len() <= max_supply`.
    #[serde(default)]
    pub nft_metadata_uris: Vec<String>,
    /// Append-only; every `nft_index` unique and within `nft_metadata_uris`.
    #[serde(default)]
    pub minted_nfts: Vec<MintedItem>,
}

impl Collection {
    /// Check the numeric ranges and the supply invariant.
    pub fn validate(&self) -> Result<(), Error> {
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
        if self.nft_metadata_uris.len() > self.max_supply as usize {
            return Err(Error::Validation(format!(
                "{} item metadata URIs exceed max supply {}",
                self.nft_metadata_uris.len(),
                self.max_supply
            )));
        }
        Ok(())
    }

    /// Whether the item at `index` has already been minted.
    pub fn is_minted(&self, index: u32) -> bool {
        self.minted_nfts.iter().any(|m| m.nft_index == index)
    }

    /// Append a minted item, enforcing the supply and uniqueness invariants.
    pub fn append_minted(&mut self, item: MintedItem) -> Result<(), Error> {
        if self.minted_nfts.len() >= self.max_supply as usize {
            return Err(Error::Validation(format!(
                "collection {} is fully minted ({} of {})",
                self.collection_mint,
                self.minted_nfts.len(),
                self.max_supply
            )));
        }
        if item.nft_index as usize >= self.nft_metadata_uris.len() {
            return Err(Error::Validation(format!(
                "item index {} out of range ({} items)",
                item.nft_index,
                self.nft_metadata_uris.len()
            )));
        }
        if self.is_minted(item.nft_index) {
            return Err(Error::Validation(format!(
                "item {} already minted",
                item.nft_index
            )));
        }
        self.minted_nfts.push(item);
        Ok(())
    }
}

/// A single token minted from a collection. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintedItem {
    pub nft_mint: String,
    pub nft_index: u32,
    pub nft_metadata_uri: String,
    #[serde(default)]
    pub minted_at: String,
}

/// One `{trait_type, value}` pair from a metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: serde_json::Value,
}

/// Parsed metadata document for one item, derived and never persisted.
/// Always well-formed: resolution failures substitute a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMetadata {
    /// Stable list id (`item-{n}`), keyed by positional index.
    pub id: String,
    pub name: String,
    pub image: String,
    pub attributes: Vec<NftAttribute>,
}

impl ResolvedMetadata {
    /// Deterministic substitute for a failed fetch/parse at `index`.
    pub fn placeholder(index: usize) -> Self {
        Self {
            id: format!("item-{}", index + 1),
            name: format!("NFT #{}", index + 1),
            image: PLACEHOLDER_IMAGE.into(),
            attributes: Vec::new(),
        }
    }
}

/// Summary of one wallet-held token as surfaced by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub mint: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub metadata_uri: String,
    #[serde(default)]
    pub image_url: String,
    /// External metadata document, when it could be fetched.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// One marketplace listing record (auction sub-resource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionListing {
    pub mint: String,
    pub owner: String,
    pub price: f64,
    pub metadata_uri: String,
    #[serde(default)]
    pub created_at: String,
}

/// Current time as an RFC 3339 timestamp, the backend's date format.
pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(max_supply: u32, uris: usize) -> Collection {
        Collection {
            collection_mint: "CoLLection111111111111111111111111111111111".into(),
            name: "Test Drop".into(),
            symbol: "TD".into(),
            description: "test".into(),
            creator_address: "Creator1111111111111111111111111111111111".into(),
            mint_price: 1.0,
            max_supply,
            royalty_percentage: 5,
            created_at: now_iso(),
            collection_metadata_uri: "ipfs://collection".into(),
            image: None,
            nft_metadata_uris: (0..uris).map(|i| format!("ipfs://item-{i}")).collect(),
            minted_nfts: Vec::new(),
        }
    }

    fn item(index: u32) -> MintedItem {
        MintedItem {
            nft_mint: format!("Mint{index}"),
            nft_index: index,
            nft_metadata_uri: format!("ipfs://item-{index}"),
            minted_at: now_iso(),
        }
    }

    #[test]
    fn test_append_minted_respects_max_supply() {
        let mut c = collection(2, 2);
        c.append_minted(item(0)).unwrap();
        c.append_minted(item(1)).unwrap();
        assert!(c.append_minted(item(1)).is_err());
        assert_eq!(c.minted_nfts.len(), 2);
    }

    #[test]
    fn test_append_minted_rejects_duplicate_index() {
        let mut c = collection(5, 3);
        c.append_minted(item(1)).unwrap();
        let err = c.append_minted(item(1)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(c.minted_nfts.len(), 1);
    }

    #[test]
    fn test_append_minted_rejects_out_of_range_index() {
        let mut c = collection(5, 2);
        assert!(c.append_minted(item(2)).is_err());
        assert!(c.minted_nfts.is_empty());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(collection(10, 5).validate().is_ok());

        let mut c = collection(10, 5);
        c.royalty_percentage = 51;
        assert!(c.validate().is_err());

        let mut c = collection(10, 5);
        c.mint_price = 0.0;
        assert!(c.validate().is_err());

        let c = collection(3, 5);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_placeholder_is_well_formed() {
        let p = ResolvedMetadata::placeholder(4);
        assert_eq!(p.name, "NFT #5");
        assert_eq!(p.id, "item-5");
        assert!(!p.image.is_empty());
        assert!(p.attributes.is_empty());
    }

    #[test]
    fn test_collection_json_field_names() {
        let c = collection(2, 1);
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("collectionMint").is_some());
        assert!(json.get("nftMetadataUris").is_some());
        assert!(json.get("mintedNfts").is_some());
        assert!(json.get("royaltyPercentage").is_some());
    }
}
