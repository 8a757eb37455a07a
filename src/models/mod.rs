mod chain;
mod holder;
mod job;
mod valuation;

pub use chain::{ChainId, ChainIdError, ChainScope};
pub use holder::{format_amount, HolderRecord, SymbolKind};
pub use job::{ValuationJobState, ValuationMode, DAILY_JOB_LOCK};
pub use valuation::{AddressValuation, ValuationKind};
