#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tokenworth::clock::FixedClock;
use tokenworth::config::Config;
use tokenworth::guard::{MemoryKeyValueCache, MemoryLockProvider};
use tokenworth::holders::HolderSource;
use tokenworth::models::{ChainId, ChainScope, HolderRecord, SymbolKind};
use tokenworth::pricing::{
    MemoryNftSaleSource, MemoryPriceOracle, NftSaleSource, PriceOracle, PricePoint,
};
use tokenworth::storage::MemoryValuationStore;
use tokenworth::valuation::ValuationService;

pub fn aelf() -> ChainId {
    ChainId::new("AELF").unwrap()
}

pub fn fungible(address: &str, symbol: &str, amount: Decimal) -> HolderRecord {
    record(address, symbol, SymbolKind::Fungible, amount)
}

pub fn nft(address: &str, symbol: &str, amount: Decimal) -> HolderRecord {
    record(address, symbol, SymbolKind::NonFungible, amount)
}

pub fn record(address: &str, symbol: &str, kind: SymbolKind, amount: Decimal) -> HolderRecord {
    HolderRecord {
        address: address.to_string(),
        chain: aelf(),
        symbol: symbol.to_string(),
        kind,
        raw_amount: 0,
        formatted_amount: amount,
    }
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap(),
    ))
}

/// Config pricing "FUN" and polling locks quickly.
pub fn test_config() -> Config {
    let mut config = Config {
        priced_symbols: vec!["ELF".to_string(), "FUN".to_string()],
        ..Config::default()
    };
    config.guard.lock_poll_interval = Duration::from_millis(5);
    config.guard.lock_wait_timeout = Duration::from_secs(5);
    config
}

/// Serves hand-built pages by page index, ignoring filters.
pub struct PagedHolderSource {
    pages: Vec<Vec<HolderRecord>>,
    slow_from: Option<(usize, Duration)>,
    pub calls: AtomicUsize,
}

impl PagedHolderSource {
    pub fn new(pages: Vec<Vec<HolderRecord>>) -> Self {
        Self {
            pages,
            slow_from: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before serving page `index` and every page after it.
    pub fn slow_from_page(mut self, index: usize, delay: Duration) -> Self {
        self.slow_from = Some((index, delay));
        self
    }
}

#[async_trait]
impl HolderSource for PagedHolderSource {
    async fn fetch_holder_page(
        &self,
        _scope: &ChainScope,
        _address: Option<&str>,
        skip: usize,
        page_size: usize,
    ) -> Result<Vec<HolderRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = skip / page_size;
        if let Some((from, delay)) = self.slow_from {
            if index >= from {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}

/// Serves pages like [`PagedHolderSource`] but fails once the walk reaches `fail_at_page`.
pub struct FailingHolderSource {
    pages: Vec<Vec<HolderRecord>>,
    fail_at_page: usize,
}

impl FailingHolderSource {
    pub fn new(pages: Vec<Vec<HolderRecord>>, fail_at_page: usize) -> Self {
        Self {
            pages,
            fail_at_page,
        }
    }
}

#[async_trait]
impl HolderSource for FailingHolderSource {
    async fn fetch_holder_page(
        &self,
        _scope: &ChainScope,
        _address: Option<&str>,
        skip: usize,
        page_size: usize,
    ) -> Result<Vec<HolderRecord>> {
        let index = skip / page_size;
        if index >= self.fail_at_page {
            anyhow::bail!("holder index timed out at skip {skip}");
        }
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}

/// Price oracle that counts lookups per symbol, optionally sleeping or failing.
#[derive(Default)]
pub struct CountingPriceOracle {
    inner: MemoryPriceOracle,
    delay: Option<Duration>,
    failing: bool,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingPriceOracle {
    pub fn new(inner: MemoryPriceOracle) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_on_fetch(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl PriceOracle for CountingPriceOracle {
    async fn get_price(&self, symbol: &str, quote: &str) -> Result<PricePoint> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            anyhow::bail!("price oracle unavailable for {symbol}/{quote}");
        }
        self.inner.get_price(symbol, quote).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Give a dropped run's background release a chance to land.
pub async fn wait_until_free(locks: &MemoryLockProvider, name: &str) -> bool {
    for _ in 0..100 {
        if !locks.is_held(name).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    false
}

/// FUN = 2 ELF (FUN/USD 1, ELF/USD 0.5).
pub fn standard_prices() -> MemoryPriceOracle {
    MemoryPriceOracle::new()
        .with_price("ELF", "USD", Decimal::new(5, 1))
        .with_price("FUN", "USD", Decimal::ONE)
}

pub struct Harness {
    pub service: ValuationService,
    pub store: Arc<MemoryValuationStore>,
    pub oracle: Arc<CountingPriceOracle>,
    pub locks: Arc<MemoryLockProvider>,
    pub cache: Arc<MemoryKeyValueCache>,
    pub clock: Arc<FixedClock>,
}

pub fn harness(holders: Arc<dyn HolderSource>, oracle: CountingPriceOracle) -> Harness {
    harness_with_sales(holders, oracle, MemoryNftSaleSource::new())
}

pub fn harness_with_sales(
    holders: Arc<dyn HolderSource>,
    oracle: CountingPriceOracle,
    sales: impl NftSaleSource + 'static,
) -> Harness {
    let clock = fixed_clock();
    let store = Arc::new(MemoryValuationStore::new());
    let oracle = Arc::new(oracle);
    let locks = Arc::new(MemoryLockProvider::new().with_clock(clock.clone()));
    let cache = Arc::new(MemoryKeyValueCache::new().with_clock(clock.clone()));
    let service = ValuationService::new(
        holders,
        oracle.clone(),
        Arc::new(sales),
        store.clone(),
        locks.clone(),
        cache.clone(),
        test_config(),
    )
    .with_clock(clock.clone());

    Harness {
        service,
        store,
        oracle,
        locks,
        cache,
        clock,
    }
}
