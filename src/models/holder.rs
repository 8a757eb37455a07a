use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ChainId;

/// Whether a symbol is a fungible token or an NFT collection item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Fungible,
    NonFungible,
    /// Anything the indexer reports that we do not recognize. Values as zero.
    #[serde(other)]
    Unknown,
}

/// One (address, symbol) balance as reported by the holder index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderRecord {
    pub address: String,
    pub chain: ChainId,
    pub symbol: String,
    pub kind: SymbolKind,
    /// Balance in the token's smallest unit.
    pub raw_amount: i128,
    /// `raw_amount / 10^decimals`.
    pub formatted_amount: Decimal,
}

impl HolderRecord {
    pub fn new(
        address: impl Into<String>,
        chain: ChainId,
        symbol: impl Into<String>,
        kind: SymbolKind,
        raw_amount: i128,
        decimals: u32,
    ) -> Self {
        Self {
            address: address.into(),
            chain,
            symbol: symbol.into(),
            kind,
            raw_amount,
            formatted_amount: format_amount(raw_amount, decimals),
        }
    }
}

/// Shift a smallest-unit amount into human units. Falls back to zero when the
/// amount does not fit a `Decimal` mantissa.
pub fn format_amount(raw_amount: i128, decimals: u32) -> Decimal {
    Decimal::try_from_i128_with_scale(raw_amount, decimals).unwrap_or_else(|_| {
        tracing::warn!(raw_amount, decimals, "raw amount out of decimal range, using zero");
        Decimal::ZERO
    })
}
