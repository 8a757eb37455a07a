pub mod clock;
pub mod config;
pub mod duration;
pub mod fixture;
pub mod guard;
pub mod holders;
pub mod models;
pub mod pricing;
pub mod storage;
pub mod valuation;
