use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{GroupAccumulator, Sink};
use crate::config::Config;
use crate::holders::PageWalker;
use crate::models::{AddressValuation, ChainScope, HolderRecord, SymbolKind, ValuationKind};
use crate::pricing::PriceCache;

/// Outcome of one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Valuations persisted by the run.
    pub valuations: usize,
    /// Holder records seen, across all addresses.
    pub records: u64,
    /// The last valuation persisted, if any.
    pub last: Option<AddressValuation>,
}

/// One valuation run: walks holder pages, values each record, groups by
/// address and persists every closed group.
///
/// All state is owned by the run and dropped with it. A failure anywhere
/// aborts the run; the group still open at that point is never persisted.
pub struct Aggregator {
    walker: PageWalker,
    prices: PriceCache,
    groups: GroupAccumulator,
    sink: Sink,
    chain: ChainScope,
    kind: ValuationKind,
    as_of: DateTime<Utc>,
    native_decimals: u32,
    fiat_decimals: u32,
    single_address: bool,
}

impl Aggregator {
    pub fn new(
        walker: PageWalker,
        prices: PriceCache,
        sink: Sink,
        chain: ChainScope,
        kind: ValuationKind,
        as_of: DateTime<Utc>,
        config: &Config,
    ) -> Self {
        Self {
            walker,
            prices,
            groups: GroupAccumulator::new(),
            sink,
            chain,
            kind,
            as_of,
            native_decimals: config.native_decimals,
            fiat_decimals: config.fiat_decimals,
            single_address: false,
        }
    }

    /// Attach the run's record total to the last valuation.
    pub fn single_address(mut self) -> Self {
        self.single_address = true;
        self
    }

    pub async fn run(mut self) -> Result<RunSummary> {
        let mut records: u64 = 0;
        let mut last = None;

        while let Some(page) = self.walker.next_page().await? {
            self.prices
                .prime_nft_prices(
                    page.iter()
                        .filter(|r| r.kind == SymbolKind::NonFungible)
                        .map(|r| r.symbol.as_str()),
                )
                .await?;

            for record in &page {
                records += 1;
                let value = self.value_of(record).await?;
                let contribution = AddressValuation::contribution(
                    record.address.clone(),
                    self.chain.clone(),
                    self.kind,
                    self.as_of,
                    record.kind,
                    value,
                );
                if let Some(closed) = self.groups.push(contribution) {
                    last = Some(self.close(closed).await?);
                }
            }
        }

        if let Some(mut open) = self.groups.finish() {
            if self.single_address {
                open.run_record_count = Some(records);
            }
            last = Some(self.close(open).await?);
        }

        info!(
            chain = %self.chain,
            kind = ?self.kind,
            records,
            valuations = self.sink.written(),
            symbols = self.prices.symbol_count(),
            "valuation run finished"
        );

        Ok(RunSummary {
            valuations: self.sink.written(),
            records,
            last,
        })
    }

    async fn value_of(&mut self, record: &HolderRecord) -> Result<Decimal> {
        let unit_price = self.prices.unit_price(&record.symbol, record.kind).await?;
        match record.formatted_amount.checked_mul(unit_price) {
            Some(value) => Ok(value.round_dp(self.native_decimals)),
            None => {
                warn!(
                    address = %record.address,
                    symbol = %record.symbol,
                    amount = %record.formatted_amount,
                    "holding value overflowed, valuing at zero"
                );
                Ok(Decimal::ZERO)
            }
        }
    }

    async fn close(&mut self, group: AddressValuation) -> Result<AddressValuation> {
        let native_fiat = self.prices.native_fiat_price().await?;
        let valuation = group.with_fiat(native_fiat, self.fiat_decimals);
        self.sink.emit(&valuation).await?;
        Ok(valuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holders::{HolderSource, MemoryHolderSource};
    use crate::models::ChainId;
    use crate::pricing::{MemoryNftSaleSource, MemoryPriceOracle, NftSalePrice};
    use crate::storage::MemoryValuationStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn record(address: &str, symbol: &str, kind: SymbolKind, amount: Decimal) -> HolderRecord {
        HolderRecord {
            address: address.to_string(),
            chain: ChainId::new("AELF").unwrap(),
            symbol: symbol.to_string(),
            kind,
            raw_amount: 0,
            formatted_amount: amount,
        }
    }

    fn aggregator(
        records: Vec<HolderRecord>,
        store: Arc<MemoryValuationStore>,
        page_size: usize,
    ) -> Aggregator {
        let config = Config {
            priced_symbols: vec!["FUN".to_string()],
            ..Config::default()
        };
        let source: Arc<dyn HolderSource> = Arc::new(MemoryHolderSource::new(records));
        let oracle = MemoryPriceOracle::new()
            .with_price("FUN", "USD", dec!(2))
            .with_price("ELF", "USD", dec!(1));
        let sales = MemoryNftSaleSource::new().with_sale("NFT-1", NftSalePrice::new(dec!(30), "ELF"));
        let prices = PriceCache::new(Arc::new(oracle), Arc::new(sales), ChainScope::All, &config);
        let walker = PageWalker::new(source, ChainScope::All, None, page_size);

        Aggregator::new(
            walker,
            prices,
            Sink::new(store),
            ChainScope::All,
            ValuationKind::Daily,
            Utc::now(),
            &config,
        )
    }

    #[tokio::test]
    async fn values_and_groups_a_single_page() -> Result<()> {
        let store = Arc::new(MemoryValuationStore::new());
        let summary = aggregator(
            vec![
                record("A", "FUN", SymbolKind::Fungible, dec!(100)),
                record("A", "FUN", SymbolKind::Fungible, dec!(50)),
                record("B", "NFT-1", SymbolKind::NonFungible, dec!(1)),
            ],
            store.clone(),
            1000,
        )
        .run()
        .await?;

        assert_eq!(summary.valuations, 2);
        assert_eq!(summary.records, 3);
        let all = store.all().await;
        assert_eq!(all[0].total_fungible_value, dec!(300));
        assert_eq!(all[0].fungible_fiat_value, dec!(300));
        assert_eq!(all[1].total_non_fungible_value, dec!(30));
        assert_eq!(all[1].run_record_count, None);
        Ok(())
    }

    #[tokio::test]
    async fn single_address_run_attaches_record_total() -> Result<()> {
        let store = Arc::new(MemoryValuationStore::new());
        let summary = aggregator(
            vec![
                record("A", "FUN", SymbolKind::Fungible, dec!(1)),
                record("A", "ELF", SymbolKind::Fungible, dec!(1)),
                record("A", "NFT-1", SymbolKind::NonFungible, dec!(2)),
            ],
            store,
            2,
        )
        .single_address()
        .run()
        .await?;

        let last = summary.last.expect("one valuation");
        assert_eq!(last.run_record_count, Some(3));
        assert_eq!(last.record_count, 3);
        assert_eq!(last.total_fungible_value, dec!(3));
        assert_eq!(last.total_non_fungible_value, dec!(60));
        Ok(())
    }

    #[tokio::test]
    async fn empty_stream_persists_nothing() -> Result<()> {
        let store = Arc::new(MemoryValuationStore::new());
        let summary = aggregator(Vec::new(), store.clone(), 10).run().await?;

        assert_eq!(summary.valuations, 0);
        assert!(summary.last.is_none());
        assert_eq!(store.upsert_count().await, 0);
        Ok(())
    }
}
