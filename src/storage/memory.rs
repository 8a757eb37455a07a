// src/storage/memory.rs
//! In-memory valuation storage for tests and fixtures.

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::{AddressValuation, ChainScope, ValuationKind};

use super::ValuationStore;

type Key = (String, ChainScope, ValuationKind);

/// In-memory valuation store. Counts upserts so tests can assert on writes.
#[derive(Default)]
pub struct MemoryValuationStore {
    valuations: Mutex<HashMap<Key, AddressValuation>>,
    upserts: Mutex<Vec<Key>>,
}

impl MemoryValuationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of upsert calls so far, including overwrites.
    pub async fn upsert_count(&self) -> usize {
        self.upserts.lock().await.len()
    }

    /// Addresses in the order they were written.
    pub async fn upserted_addresses(&self) -> Vec<String> {
        self.upserts
            .lock()
            .await
            .iter()
            .map(|(address, _, _)| address.clone())
            .collect()
    }

    pub async fn all(&self) -> Vec<AddressValuation> {
        let mut all: Vec<_> = self.valuations.lock().await.values().cloned().collect();
        all.sort_by(|a, b| a.address.cmp(&b.address));
        all
    }
}

#[async_trait::async_trait]
impl ValuationStore for MemoryValuationStore {
    async fn upsert(&self, valuation: &AddressValuation) -> Result<()> {
        let key = (
            valuation.address.clone(),
            valuation.chain.clone(),
            valuation.kind,
        );
        self.valuations
            .lock()
            .await
            .insert(key.clone(), valuation.clone());
        self.upserts.lock().await.push(key);
        Ok(())
    }

    async fn get(
        &self,
        address: &str,
        chain: &ChainScope,
        kind: ValuationKind,
    ) -> Result<Option<AddressValuation>> {
        let valuations = self.valuations.lock().await;
        Ok(valuations
            .get(&(address.to_string(), chain.clone(), kind))
            .cloned())
    }
}
