use anyhow::Result;

use crate::models::{ChainScope, HolderRecord};

/// Paged access to the holder index.
///
/// Pages must come back ordered by address (non-decreasing) and the order must
/// be stable across calls, so that one address never spans non-adjacent pages.
/// An empty page means the stream is exhausted.
#[async_trait::async_trait]
pub trait HolderSource: Send + Sync {
    async fn fetch_holder_page(
        &self,
        scope: &ChainScope,
        address: Option<&str>,
        skip: usize,
        page_size: usize,
    ) -> Result<Vec<HolderRecord>>;
}

/// Holder index backed by a vector, for tests and fixtures.
#[derive(Debug, Default)]
pub struct MemoryHolderSource {
    records: Vec<HolderRecord>,
}

impl MemoryHolderSource {
    pub fn new(mut records: Vec<HolderRecord>) -> Self {
        // Stable, so per-address record order is kept as given.
        records.sort_by(|a, b| a.address.cmp(&b.address));
        Self { records }
    }
}

#[async_trait::async_trait]
impl HolderSource for MemoryHolderSource {
    async fn fetch_holder_page(
        &self,
        scope: &ChainScope,
        address: Option<&str>,
        skip: usize,
        page_size: usize,
    ) -> Result<Vec<HolderRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| scope.covers(&r.chain))
            .filter(|r| address.is_none_or(|a| r.address == a))
            .skip(skip)
            .take(page_size)
            .cloned()
            .collect())
    }
}
