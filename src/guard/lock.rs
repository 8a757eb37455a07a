use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};

/// Proof of lock ownership. Only the holder of the matching token can release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    pub name: String,
    pub token: Uuid,
}

/// Named, leased, non-blocking locks shared between processes.
#[async_trait::async_trait]
pub trait LockProvider: Send + Sync {
    /// Take the lock if nobody holds it. `None` means it is held elsewhere.
    async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<Option<LockHandle>>;

    /// Release a lock. Releasing a lock that expired or changed owner is a no-op.
    async fn release(&self, handle: LockHandle) -> Result<()>;
}

/// In-process lock table with lease expiry driven by a [`Clock`].
pub struct MemoryLockProvider {
    held: Mutex<HashMap<String, (Uuid, DateTime<Utc>)>>,
    clock: Arc<dyn Clock>,
}

impl MemoryLockProvider {
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashMap::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn is_held(&self, name: &str) -> bool {
        let now = self.clock.now();
        let held = self.held.lock().await;
        held.get(name).is_some_and(|(_, expires)| *expires > now)
    }
}

impl Default for MemoryLockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LockProvider for MemoryLockProvider {
    async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<Option<LockHandle>> {
        let now = self.clock.now();
        let lease = chrono::Duration::from_std(ttl).context("Lock TTL out of range")?;

        let mut held = self.held.lock().await;
        if let Some((_, expires)) = held.get(name) {
            if *expires > now {
                return Ok(None);
            }
        }

        let token = Uuid::new_v4();
        held.insert(name.to_string(), (token, now + lease));
        Ok(Some(LockHandle {
            name: name.to_string(),
            token,
        }))
    }

    async fn release(&self, handle: LockHandle) -> Result<()> {
        let mut held = self.held.lock().await;
        if held
            .get(&handle.name)
            .is_some_and(|(token, _)| *token == handle.token)
        {
            held.remove(&handle.name);
        } else {
            tracing::debug!(lock = %handle.name, "lock no longer owned at release");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    #[tokio::test]
    async fn second_acquire_fails_until_release() -> Result<()> {
        let locks = MemoryLockProvider::new();
        let ttl = Duration::from_secs(60);

        let handle = locks.try_acquire("valuate:A", ttl).await?.expect("free lock");
        assert!(locks.try_acquire("valuate:A", ttl).await?.is_none());
        assert!(locks.try_acquire("valuate:B", ttl).await?.is_some());

        locks.release(handle).await?;
        assert!(locks.try_acquire("valuate:A", ttl).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn expired_lease_can_be_taken_over() -> Result<()> {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
        ));
        let locks = MemoryLockProvider::new().with_clock(clock.clone());

        let stale = locks
            .try_acquire("valuate-daily-job", Duration::from_secs(30))
            .await?
            .expect("free lock");
        clock.advance(chrono::Duration::seconds(31));
        assert!(!locks.is_held("valuate-daily-job").await);

        let fresh = locks
            .try_acquire("valuate-daily-job", Duration::from_secs(30))
            .await?
            .expect("expired lease is free");

        // The old owner must not release the new owner's lock.
        locks.release(stale).await?;
        assert!(locks.is_held("valuate-daily-job").await);
        locks.release(fresh).await?;
        assert!(!locks.is_held("valuate-daily-job").await);
        Ok(())
    }
}
