//! JSON fixtures that stand in for the holder index, price oracle and NFT
//! sale feed, so the pipeline can run end to end without live services.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::holders::MemoryHolderSource;
use crate::models::{ChainId, HolderRecord, SymbolKind};
use crate::pricing::{MemoryNftSaleSource, MemoryPriceOracle, NftSalePrice};

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureHolder {
    pub address: String,
    pub chain: ChainId,
    pub symbol: String,
    pub kind: SymbolKind,
    pub raw_amount: i128,
    #[serde(default)]
    pub decimals: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    pub holders: Vec<FixtureHolder>,
    /// symbol -> price in the configured fiat unit
    #[serde(default)]
    pub prices: HashMap<String, Decimal>,
    #[serde(default)]
    pub nft_sales: HashMap<String, NftSalePrice>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture file: {}", path.display()))
    }

    pub fn holder_source(&self) -> MemoryHolderSource {
        MemoryHolderSource::new(
            self.holders
                .iter()
                .map(|h| {
                    HolderRecord::new(
                        h.address.clone(),
                        h.chain.clone(),
                        h.symbol.clone(),
                        h.kind,
                        h.raw_amount,
                        h.decimals,
                    )
                })
                .collect(),
        )
    }

    pub fn price_oracle(&self, fiat_symbol: &str) -> MemoryPriceOracle {
        self.prices
            .iter()
            .fold(MemoryPriceOracle::new(), |oracle, (symbol, price)| {
                oracle.with_price(symbol, fiat_symbol, *price)
            })
    }

    pub fn nft_sale_source(&self) -> MemoryNftSaleSource {
        self.nft_sales
            .iter()
            .fold(MemoryNftSaleSource::new(), |source, (symbol, sale)| {
                source.with_sale(symbol, sale.clone())
            })
    }
}
