//! Pipeline entry points.
//!
//! - [`StrategySelector`]: Pick the single source for a run
//! - [`Pipeline`]: Collect, deduplicate, summarize, persist and notify
//! - [`run_scheduled`]: Repeat runs on an interval or daily schedule

pub mod orchestrator;
pub mod schedule;
pub mod strategy;

#[cfg(test)]
pub(crate) mod fakes;

pub use orchestrator::Pipeline;
pub use schedule::{Schedule, run_scheduled};
pub use strategy::{
    Candidate, CollectOutcome, CollectorFactory, Fallback, Strategy, StrategySelector, candidates,
};
