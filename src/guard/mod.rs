//! Entry gating for valuation runs.
//!
//! Current valuations are single-flight per address behind a lock and a
//! short-lived cache. Daily valuations run once per chain and calendar day
//! behind a job-wide lock and a persistent marker key. The lock and the
//! marker are separate primitives: the marker has to survive restarts, the
//! lock does not.

mod kv;
mod lock;

pub use kv::{KeyValueCache, MemoryKeyValueCache};
pub use lock::{LockHandle, LockProvider, MemoryLockProvider};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::models::{AddressValuation, ValuationJobState};

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Timed out after {waited:?} waiting for lock {name}")]
    LockWaitTimeout { name: String, waited: Duration },
}

/// What a daily entry attempt did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DailyOutcome {
    /// The pipeline ran and persisted this many valuations.
    Completed { valuations: usize },
    /// The marker for this chain and day already exists.
    AlreadyDone,
    /// Another process holds the daily job lock.
    AlreadyRunning,
}

pub struct ConcurrencyGuard {
    locks: Arc<dyn LockProvider>,
    cache: Arc<dyn KeyValueCache>,
    config: GuardConfig,
    clock: Arc<dyn Clock>,
}

impl ConcurrencyGuard {
    pub fn new(
        locks: Arc<dyn LockProvider>,
        cache: Arc<dyn KeyValueCache>,
        config: GuardConfig,
    ) -> Self {
        Self {
            locks,
            cache,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Return the cached current valuation for `job`, or compute it while
    /// holding the address lock. Callers that lose the race poll until the
    /// winner's result shows up in the cache or the lock frees up.
    pub async fn single_flight<F, Fut>(
        &self,
        job: &ValuationJobState,
        compute: F,
    ) -> Result<AddressValuation>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AddressValuation>>,
    {
        let cache_key = job
            .cache_key()
            .context("single-flight valuation needs a current-mode job")?;
        let lock_name = job.lock_name();
        let started = tokio::time::Instant::now();

        let lease = loop {
            if let Some(cached) = self.cached_valuation(&cache_key).await? {
                debug!(key = %cache_key, "serving cached current valuation");
                return Ok(cached);
            }

            if let Some(handle) = self
                .locks
                .try_acquire(&lock_name, self.config.lock_ttl)
                .await
                .with_context(|| format!("Failed to acquire lock {lock_name}"))?
            {
                break HeldLock::new(self.locks.clone(), handle);
            }

            let waited = started.elapsed();
            if waited >= self.config.lock_wait_timeout {
                return Err(GuardError::LockWaitTimeout {
                    name: lock_name,
                    waited,
                }
                .into());
            }
            debug!(lock = %lock_name, "lock held elsewhere, waiting");
            tokio::time::sleep(self.config.lock_poll_interval).await;
        };

        let result: Result<AddressValuation> = async {
            // The previous holder may have filled the cache just before releasing.
            if let Some(cached) = self.cached_valuation(&cache_key).await? {
                return Ok(cached);
            }
            let valuation = compute().await?;
            let encoded =
                serde_json::to_string(&valuation).context("Failed to encode valuation")?;
            self.cache
                .set(&cache_key, &encoded, Some(self.config.current_ttl))
                .await
                .with_context(|| format!("Failed to cache valuation under {cache_key}"))?;
            Ok(valuation)
        }
        .await;

        lease.release().await;
        result
    }

    /// Run `job_fn` at most once per chain and day. `job_fn` returns the
    /// number of persisted valuations; the marker is only set on success.
    pub async fn once_per_day<F, Fut>(
        &self,
        job: &ValuationJobState,
        job_fn: F,
    ) -> Result<DailyOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<usize>>,
    {
        let marker = job
            .marker_key()
            .context("once-per-day valuation needs a daily-mode job")?;

        if self.marker_exists(&marker).await? {
            info!(marker = %marker, "daily valuation already done");
            return Ok(DailyOutcome::AlreadyDone);
        }

        let lock_name = job.lock_name();
        let Some(handle) = self
            .locks
            .try_acquire(&lock_name, self.config.lock_ttl)
            .await
            .with_context(|| format!("Failed to acquire lock {lock_name}"))?
        else {
            info!(lock = %lock_name, "daily valuation already running elsewhere");
            return Ok(DailyOutcome::AlreadyRunning);
        };
        let lease = HeldLock::new(self.locks.clone(), handle);

        let result: Result<DailyOutcome> = async {
            if self.marker_exists(&marker).await? {
                return Ok(DailyOutcome::AlreadyDone);
            }
            let valuations = job_fn().await?;
            self.cache
                .set(&marker, &self.clock.now().to_rfc3339(), None)
                .await
                .with_context(|| format!("Failed to set daily marker {marker}"))?;
            Ok(DailyOutcome::Completed { valuations })
        }
        .await;

        lease.release().await;
        result
    }

    async fn marker_exists(&self, marker: &str) -> Result<bool> {
        self.cache
            .exists(marker)
            .await
            .with_context(|| format!("Failed to check daily marker {marker}"))
    }

    async fn cached_valuation(&self, key: &str) -> Result<Option<AddressValuation>> {
        let Some(raw) = self
            .cache
            .get(key)
            .await
            .with_context(|| format!("Failed to read cache key {key}"))?
        else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(valuation) => Ok(Some(valuation)),
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable cached valuation");
                Ok(None)
            }
        }
    }
}

/// A lock held for one run. Released explicitly when the run finishes, or
/// from a background task if the run's future is dropped first.
struct HeldLock {
    locks: Arc<dyn LockProvider>,
    handle: Option<LockHandle>,
}

impl HeldLock {
    fn new(locks: Arc<dyn LockProvider>, handle: LockHandle) -> Self {
        Self {
            locks,
            handle: Some(handle),
        }
    }

    async fn release(mut self) {
        if let Some(handle) = self.handle.take() {
            release_lock(self.locks.as_ref(), handle).await;
        }
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(lock = %handle.name, "run dropped while holding lock, releasing");
                let locks = self.locks.clone();
                runtime.spawn(async move { release_lock(locks.as_ref(), handle).await });
            }
            // The lease still expires after lock_ttl.
            Err(_) => warn!(lock = %handle.name, "no runtime to release dropped lock"),
        }
    }
}

async fn release_lock(locks: &dyn LockProvider, handle: LockHandle) {
    let name = handle.name.clone();
    // The lease expires on its own, so a failed release only delays the next run.
    if let Err(e) = locks.release(handle).await {
        warn!(lock = %name, error = %e, "failed to release lock");
    }
}
