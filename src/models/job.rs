use chrono::NaiveDate;

use super::{ChainScope, ValuationKind};

/// Lock name shared by every daily run, regardless of chain.
pub const DAILY_JOB_LOCK: &str = "valuate-daily-job";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuationMode {
    Current { address: String },
    Daily { date: NaiveDate },
}

/// Key material for locks, markers and caches of one valuation job.
///
/// Has no storage of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuationJobState {
    pub mode: ValuationMode,
    pub chain: ChainScope,
}

impl ValuationJobState {
    pub fn current(chain: ChainScope, address: impl Into<String>) -> Self {
        Self {
            mode: ValuationMode::Current {
                address: address.into(),
            },
            chain,
        }
    }

    pub fn daily(chain: ChainScope, date: NaiveDate) -> Self {
        Self {
            mode: ValuationMode::Daily { date },
            chain,
        }
    }

    pub fn kind(&self) -> ValuationKind {
        match self.mode {
            ValuationMode::Current { .. } => ValuationKind::Current,
            ValuationMode::Daily { .. } => ValuationKind::Daily,
        }
    }

    pub fn lock_name(&self) -> String {
        match &self.mode {
            ValuationMode::Current { address } => format!("valuate:{address}"),
            ValuationMode::Daily { .. } => DAILY_JOB_LOCK.to_string(),
        }
    }

    /// Idempotency marker key; only daily jobs have one.
    pub fn marker_key(&self) -> Option<String> {
        match &self.mode {
            ValuationMode::Daily { date } => Some(format!(
                "valuate-daily:{}:{}",
                self.chain,
                date.format("%Y-%m-%d")
            )),
            ValuationMode::Current { .. } => None,
        }
    }

    /// Cache key holding the latest current valuation; only current jobs have one.
    pub fn cache_key(&self) -> Option<String> {
        match &self.mode {
            ValuationMode::Current { address } => {
                Some(format!("valuation:current:{}:{address}", self.chain))
            }
            ValuationMode::Daily { .. } => None,
        }
    }
}
