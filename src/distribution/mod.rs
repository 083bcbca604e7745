//! Daily profit distribution
//!
//! - [`job`] - Snapshot and accrual phases, and the combined run
//! - [`scheduler`] - Optional in-process daily trigger

pub mod job;
pub mod scheduler;

pub use job::{
    AccrualFailure, AccrualReport, DistributionError, DistributionJob, RunReport, SnapshotReport,
    Today,
};
pub use scheduler::DistributionScheduler;
