use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use super::HolderSource;
use crate::models::{ChainScope, HolderRecord};

/// Walks the holder index page by page with a skip cursor.
///
/// The walk is finite and not restartable: once a page comes back empty,
/// every further call returns `None` without touching the source.
pub struct PageWalker {
    source: Arc<dyn HolderSource>,
    scope: ChainScope,
    address: Option<String>,
    page_size: usize,
    skip: usize,
    exhausted: bool,
}

impl PageWalker {
    pub fn new(
        source: Arc<dyn HolderSource>,
        scope: ChainScope,
        address: Option<String>,
        page_size: usize,
    ) -> Self {
        Self {
            source,
            scope,
            address,
            page_size,
            skip: 0,
            exhausted: false,
        }
    }

    /// Offset the next fetch will use.
    pub fn skip(&self) -> usize {
        self.skip
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<HolderRecord>>> {
        if self.exhausted {
            return Ok(None);
        }

        let skip = self.skip;
        let page = self
            .source
            .fetch_holder_page(&self.scope, self.address.as_deref(), skip, self.page_size)
            .await
            .with_context(|| {
                format!("Failed to fetch holder page (chain {}, skip {skip})", self.scope)
            })?;
        self.skip = skip + self.page_size;

        debug!(
            chain = %self.scope,
            skip,
            records = page.len(),
            "fetched holder page"
        );

        if page.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holders::MemoryHolderSource;
    use crate::models::{ChainId, SymbolKind};

    fn records(n: usize) -> Vec<HolderRecord> {
        (0..n)
            .map(|i| {
                HolderRecord::new(
                    format!("addr-{i:04}"),
                    ChainId::new("AELF").unwrap(),
                    "ELF",
                    SymbolKind::Fungible,
                    1,
                    0,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn walks_until_an_empty_page() -> Result<()> {
        let source = Arc::new(MemoryHolderSource::new(records(5)));
        let mut walker = PageWalker::new(source, ChainScope::All, None, 2);

        let mut sizes = Vec::new();
        while let Some(page) = walker.next_page().await? {
            sizes.push(page.len());
        }

        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(walker.skip(), 8);
        assert!(walker.next_page().await?.is_none());
        assert_eq!(walker.skip(), 8, "exhausted walker must not fetch again");
        Ok(())
    }

    #[tokio::test]
    async fn preserves_record_order() -> Result<()> {
        let source = Arc::new(MemoryHolderSource::new(records(3)));
        let mut walker = PageWalker::new(source, ChainScope::All, None, 1000);

        let page = walker.next_page().await?.expect("one page");
        let addresses: Vec<_> = page.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["addr-0000", "addr-0001", "addr-0002"]);
        Ok(())
    }

    struct DownAfterFirstPage(MemoryHolderSource);

    #[async_trait::async_trait]
    impl HolderSource for DownAfterFirstPage {
        async fn fetch_holder_page(
            &self,
            scope: &ChainScope,
            address: Option<&str>,
            skip: usize,
            page_size: usize,
        ) -> Result<Vec<HolderRecord>> {
            if skip > 0 {
                anyhow::bail!("index unavailable");
            }
            self.0.fetch_holder_page(scope, address, skip, page_size).await
        }
    }

    #[tokio::test]
    async fn failed_fetch_reports_its_offset_and_keeps_the_cursor() -> Result<()> {
        let source = Arc::new(DownAfterFirstPage(MemoryHolderSource::new(records(5))));
        let mut walker = PageWalker::new(source, ChainScope::All, None, 2);

        assert_eq!(walker.next_page().await?.map(|p| p.len()), Some(2));
        let err = walker.next_page().await.expect_err("second page fails");
        assert!(format!("{err:#}").contains("skip 2"));
        assert_eq!(walker.skip(), 2);
        Ok(())
    }
}
