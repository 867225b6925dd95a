//! Audit trail of pipeline activity.
//!
//! The run log keeps cumulative counters, the latest output of each stage
//! and a digest of the last benchmark so `status` can report them between
//! invocations.

pub mod log;

pub use log::{BenchmarkSummary, RunLog, StageCounters, StageOutput};
