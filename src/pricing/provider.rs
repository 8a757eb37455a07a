use std::collections::HashMap;

use anyhow::Result;
use rust_decimal::Decimal;

use super::{NftSalePrice, PricePoint};
use crate::models::ChainScope;

/// Spot price lookups. Returns a zero price when the pair is unknown.
#[async_trait::async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, symbol: &str, quote: &str) -> Result<PricePoint>;

    fn name(&self) -> &str;
}

/// Last-sale prices for NFT symbols. Symbols without a sale are left out of the map.
#[async_trait::async_trait]
pub trait NftSaleSource: Send + Sync {
    async fn latest_sale_prices(
        &self,
        scope: &ChainScope,
        symbols: &[String],
    ) -> Result<HashMap<String, NftSalePrice>>;

    fn name(&self) -> &str;
}

pub struct NoopNftSaleSource;

#[async_trait::async_trait]
impl NftSaleSource for NoopNftSaleSource {
    async fn latest_sale_prices(
        &self,
        _scope: &ChainScope,
        _symbols: &[String],
    ) -> Result<HashMap<String, NftSalePrice>> {
        Ok(HashMap::new())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Fixed price table keyed by `(symbol, quote)`.
#[derive(Debug, Default, Clone)]
pub struct MemoryPriceOracle {
    prices: HashMap<(String, String), Decimal>,
}

impl MemoryPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, quote: &str, price: Decimal) -> Self {
        self.prices
            .insert((symbol.to_string(), quote.to_string()), price);
        self
    }
}

#[async_trait::async_trait]
impl PriceOracle for MemoryPriceOracle {
    async fn get_price(&self, symbol: &str, quote: &str) -> Result<PricePoint> {
        if symbol == quote {
            return Ok(PricePoint::new(symbol, quote, Decimal::ONE));
        }
        Ok(self
            .prices
            .get(&(symbol.to_string(), quote.to_string()))
            .map(|price| PricePoint::new(symbol, quote, *price))
            .unwrap_or_else(|| PricePoint::unknown(symbol, quote)))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Fixed last-sale table keyed by NFT symbol.
#[derive(Debug, Default, Clone)]
pub struct MemoryNftSaleSource {
    sales: HashMap<String, NftSalePrice>,
}

impl MemoryNftSaleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sale(mut self, symbol: &str, sale: NftSalePrice) -> Self {
        self.sales.insert(symbol.to_string(), sale);
        self
    }
}

#[async_trait::async_trait]
impl NftSaleSource for MemoryNftSaleSource {
    async fn latest_sale_prices(
        &self,
        _scope: &ChainScope,
        symbols: &[String],
    ) -> Result<HashMap<String, NftSalePrice>> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.sales.get(s).map(|sale| (s.clone(), sale.clone())))
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
