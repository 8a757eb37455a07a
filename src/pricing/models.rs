use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price of `symbol` quoted in `quote_symbol`. A zero price means unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub quote_symbol: String,
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(symbol: impl Into<String>, quote_symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            quote_symbol: quote_symbol.into(),
            price,
        }
    }

    pub fn unknown(symbol: impl Into<String>, quote_symbol: impl Into<String>) -> Self {
        Self::new(symbol, quote_symbol, Decimal::ZERO)
    }

    pub fn is_known(&self) -> bool {
        self.price > Decimal::ZERO
    }
}

/// Best known last-sale price of an NFT symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftSalePrice {
    pub price: Decimal,
    pub quote_symbol: String,
}

impl NftSalePrice {
    pub fn new(price: Decimal, quote_symbol: impl Into<String>) -> Self {
        Self {
            price,
            quote_symbol: quote_symbol.into(),
        }
    }
}
