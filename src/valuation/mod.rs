mod accumulator;
mod aggregator;
mod service;
mod sink;

pub use accumulator::GroupAccumulator;
pub use aggregator::{Aggregator, RunSummary};
pub use service::ValuationService;
pub use sink::Sink;
