mod memory;

pub use memory::MemoryValuationStore;

use anyhow::Result;

use crate::models::{AddressValuation, ChainScope, ValuationKind};

/// Persistence for finished valuations, keyed by address + chain + kind.
#[async_trait::async_trait]
pub trait ValuationStore: Send + Sync {
    /// Insert or replace the valuation for its (address, chain, kind).
    async fn upsert(&self, valuation: &AddressValuation) -> Result<()>;

    async fn get(
        &self,
        address: &str,
        chain: &ChainScope,
        kind: ValuationKind,
    ) -> Result<Option<AddressValuation>>;
}
