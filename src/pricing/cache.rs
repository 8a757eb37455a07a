//! Per-run price cache.
//!
//! Converts every symbol into a native-coin unit price exactly once per
//! valuation run. Nothing here outlives the run that created it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{NftSaleSource, NftSalePrice, PriceOracle};
use crate::config::Config;
use crate::models::{ChainScope, SymbolKind};

pub struct PriceCache {
    oracle: Arc<dyn PriceOracle>,
    nft_sales: Arc<dyn NftSaleSource>,
    scope: ChainScope,
    native_symbol: String,
    fiat_symbol: String,
    native_decimals: u32,
    priced_symbols: HashSet<String>,
    /// symbol -> native unit price
    unit_prices: HashMap<String, Decimal>,
    /// symbol -> fiat price
    fiat_prices: HashMap<String, Decimal>,
    /// NFT symbols already asked for; `None` when the source had no sale.
    nft_sales_seen: HashMap<String, Option<NftSalePrice>>,
}

impl PriceCache {
    pub fn new(
        oracle: Arc<dyn PriceOracle>,
        nft_sales: Arc<dyn NftSaleSource>,
        scope: ChainScope,
        config: &Config,
    ) -> Self {
        Self {
            oracle,
            nft_sales,
            scope,
            native_symbol: config.native_symbol.clone(),
            fiat_symbol: config.fiat_symbol.clone(),
            native_decimals: config.native_decimals,
            priced_symbols: config.priced_symbols.iter().cloned().collect(),
            unit_prices: HashMap::new(),
            fiat_prices: HashMap::new(),
            nft_sales_seen: HashMap::new(),
        }
    }

    /// Number of symbols priced so far in this run.
    pub fn symbol_count(&self) -> usize {
        self.unit_prices.len()
    }

    /// Price of one unit of `symbol` in native-coin units.
    pub async fn unit_price(&mut self, symbol: &str, kind: SymbolKind) -> Result<Decimal> {
        if let Some(price) = self.unit_prices.get(symbol) {
            return Ok(*price);
        }

        let price = match kind {
            SymbolKind::Fungible => self.fungible_unit_price(symbol).await?,
            SymbolKind::NonFungible => self.nft_unit_price(symbol).await?,
            SymbolKind::Unknown => {
                warn!(symbol, "unknown symbol kind, valuing at zero");
                Decimal::ZERO
            }
        };

        debug!(symbol, kind = ?kind, price = %price, "priced symbol");
        self.unit_prices.insert(symbol.to_string(), price);
        Ok(price)
    }

    /// Native coin price in fiat, looked up at most once per run.
    pub async fn native_fiat_price(&mut self) -> Result<Decimal> {
        let native = self.native_symbol.clone();
        self.fiat_price(&native).await
    }

    /// Fetch last-sale prices for every NFT symbol not yet seen in this run,
    /// in a single call to the sale source.
    pub async fn prime_nft_prices<'a>(
        &mut self,
        symbols: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let mut wanted: Vec<String> = Vec::new();
        for symbol in symbols {
            if !self.nft_sales_seen.contains_key(symbol)
                && !self.unit_prices.contains_key(symbol)
                && !wanted.iter().any(|w| w == symbol)
            {
                wanted.push(symbol.to_string());
            }
        }
        if wanted.is_empty() {
            return Ok(());
        }

        let mut sales = self
            .nft_sales
            .latest_sale_prices(&self.scope, &wanted)
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch NFT sale prices from {} for {} symbols",
                    self.nft_sales.name(),
                    wanted.len()
                )
            })?;

        debug!(requested = wanted.len(), found = sales.len(), "fetched NFT sale prices");
        for symbol in wanted {
            let sale = sales.remove(&symbol);
            self.nft_sales_seen.insert(symbol, sale);
        }
        Ok(())
    }

    async fn fungible_unit_price(&mut self, symbol: &str) -> Result<Decimal> {
        if symbol == self.native_symbol {
            return Ok(Decimal::ONE);
        }
        if !self.priced_symbols.contains(symbol) {
            warn!(symbol, "symbol has no configured price, valuing at zero");
            return Ok(Decimal::ZERO);
        }

        let symbol_fiat = self.fiat_price(symbol).await?;
        let native_fiat = self.native_fiat_price().await?;
        Ok(self.to_native(symbol, Decimal::ONE, symbol_fiat, native_fiat))
    }

    async fn nft_unit_price(&mut self, symbol: &str) -> Result<Decimal> {
        if !self.nft_sales_seen.contains_key(symbol) {
            self.prime_nft_prices([symbol]).await?;
        }

        let Some(sale) = self.nft_sales_seen.get(symbol).cloned().flatten() else {
            debug!(symbol, "no sale price for NFT, valuing at zero");
            return Ok(Decimal::ZERO);
        };

        if sale.quote_symbol == self.native_symbol {
            return Ok(sale.price.round_dp(self.native_decimals));
        }

        let quote_fiat = self.fiat_price(&sale.quote_symbol).await?;
        let native_fiat = self.native_fiat_price().await?;
        Ok(self.to_native(symbol, sale.price, quote_fiat, native_fiat))
    }

    /// `amount` of something worth `quote_fiat` each, expressed in native units.
    fn to_native(
        &self,
        symbol: &str,
        amount: Decimal,
        quote_fiat: Decimal,
        native_fiat: Decimal,
    ) -> Decimal {
        if quote_fiat.is_zero() || native_fiat.is_zero() {
            warn!(
                symbol,
                quote_fiat = %quote_fiat,
                native_fiat = %native_fiat,
                "missing fiat price, valuing at zero"
            );
            return Decimal::ZERO;
        }
        amount
            .checked_mul(quote_fiat)
            .and_then(|v| v.checked_div(native_fiat))
            .map(|v| v.round_dp(self.native_decimals))
            .unwrap_or_else(|| {
                warn!(symbol, "price conversion overflowed, valuing at zero");
                Decimal::ZERO
            })
    }

    async fn fiat_price(&mut self, symbol: &str) -> Result<Decimal> {
        if symbol == self.fiat_symbol {
            return Ok(Decimal::ONE);
        }
        if let Some(price) = self.fiat_prices.get(symbol) {
            return Ok(*price);
        }

        let point = self
            .oracle
            .get_price(symbol, &self.fiat_symbol)
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch {symbol}/{} price from {}",
                    self.fiat_symbol,
                    self.oracle.name()
                )
            })?;

        let price = if point.price.is_sign_negative() {
            warn!(symbol, price = %point.price, "negative price from oracle, treating as unknown");
            Decimal::ZERO
        } else {
            point.price
        };
        self.fiat_prices.insert(symbol.to_string(), price);
        Ok(price)
    }
}
