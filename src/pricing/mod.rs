mod cache;
mod models;
mod provider;

pub use cache::PriceCache;
pub use models::{NftSalePrice, PricePoint};
pub use provider::{
    MemoryNftSaleSource, MemoryPriceOracle, NftSaleSource, NoopNftSaleSource, PriceOracle,
};
