use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::AddressValuation;
use crate::storage::ValuationStore;

/// Writes each closed valuation to the store, once.
pub struct Sink {
    store: Arc<dyn ValuationStore>,
    written: usize,
}

impl Sink {
    pub fn new(store: Arc<dyn ValuationStore>) -> Self {
        Self { store, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub async fn emit(&mut self, valuation: &AddressValuation) -> Result<()> {
        self.store.upsert(valuation).await.with_context(|| {
            format!(
                "Failed to persist valuation for {} on {}",
                valuation.address, valuation.chain
            )
        })?;
        self.written += 1;
        debug!(
            address = %valuation.address,
            chain = %valuation.chain,
            native = %valuation.total_value(),
            records = valuation.record_count,
            "valuation persisted"
        );
        Ok(())
    }
}
