use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use super::{Aggregator, RunSummary, Sink};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::guard::{ConcurrencyGuard, DailyOutcome, KeyValueCache, LockProvider};
use crate::holders::{HolderSource, PageWalker};
use crate::models::{AddressValuation, ChainId, ChainScope, ValuationJobState};
use crate::pricing::{NftSaleSource, PriceCache, PriceOracle};
use crate::storage::ValuationStore;

/// Entry point for current and daily valuations.
///
/// Every run gets its own price cache and accumulator; the service itself
/// holds only collaborators and settings, so it can be shared across tasks.
pub struct ValuationService {
    holders: Arc<dyn HolderSource>,
    oracle: Arc<dyn PriceOracle>,
    nft_sales: Arc<dyn NftSaleSource>,
    store: Arc<dyn ValuationStore>,
    guard: ConcurrencyGuard,
    config: Config,
    clock: Arc<dyn Clock>,
}

impl ValuationService {
    pub fn new(
        holders: Arc<dyn HolderSource>,
        oracle: Arc<dyn PriceOracle>,
        nft_sales: Arc<dyn NftSaleSource>,
        store: Arc<dyn ValuationStore>,
        locks: Arc<dyn LockProvider>,
        cache: Arc<dyn KeyValueCache>,
        config: Config,
    ) -> Self {
        let guard = ConcurrencyGuard::new(locks, cache, config.guard.clone());
        Self {
            holders,
            oracle,
            nft_sales,
            store,
            guard,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.guard = self.guard.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    /// Valuation of one address's live holdings. Served from cache when a
    /// fresh one exists; otherwise computed by exactly one caller at a time.
    pub async fn compute_current(&self, chain: &ChainId, address: &str) -> Result<AddressValuation> {
        let address = address.trim();
        if address.is_empty() || address.chars().any(char::is_whitespace) {
            anyhow::bail!("Invalid address {address:?}");
        }

        let job = ValuationJobState::current(ChainScope::Chain(chain.clone()), address);
        self.guard
            .single_flight(&job, || self.run_current(&job, address))
            .await
            .inspect_err(|e| {
                error!(chain = %chain, address, error = %format!("{e:#}"), "current valuation failed")
            })
    }

    /// Value every address in `scope` for today, unless that already happened
    /// or another process is doing it right now.
    pub async fn compute_daily(&self, scope: ChainScope) -> Result<DailyOutcome> {
        let job = ValuationJobState::daily(scope.clone(), self.clock.today());
        let outcome = self
            .guard
            .once_per_day(&job, || async {
                let summary = self.run(&job, None).await?;
                Ok::<_, anyhow::Error>(summary.valuations)
            })
            .await
            .inspect_err(|e| {
                error!(chain = %scope, error = %format!("{e:#}"), "daily valuation failed")
            })?;

        info!(chain = %scope, outcome = ?outcome, "daily valuation entry finished");
        Ok(outcome)
    }

    async fn run_current(&self, job: &ValuationJobState, address: &str) -> Result<AddressValuation> {
        let summary = self.run(job, Some(address)).await?;

        match summary.last {
            Some(valuation) => {
                if valuation.address != address {
                    warn!(
                        requested = address,
                        returned = %valuation.address,
                        "holder source ignored the address filter"
                    );
                }
                Ok(valuation)
            }
            None => {
                // No holdings left: record that, so the stored value is not stale.
                let mut empty =
                    AddressValuation::empty(address, job.chain.clone(), job.kind(), self.clock.now());
                empty.run_record_count = Some(0);
                Sink::new(self.store.clone()).emit(&empty).await?;
                Ok(empty)
            }
        }
    }

    async fn run(&self, job: &ValuationJobState, address: Option<&str>) -> Result<RunSummary> {
        let walker = PageWalker::new(
            self.holders.clone(),
            job.chain.clone(),
            address.map(str::to_string),
            self.config.page_size,
        );
        let prices = PriceCache::new(
            self.oracle.clone(),
            self.nft_sales.clone(),
            job.chain.clone(),
            &self.config,
        );
        let aggregator = Aggregator::new(
            walker,
            prices,
            Sink::new(self.store.clone()),
            job.chain.clone(),
            job.kind(),
            self.clock.now(),
            &self.config,
        );

        if address.is_some() {
            aggregator.single_address().run().await
        } else {
            aggregator.run().await
        }
    }
}
