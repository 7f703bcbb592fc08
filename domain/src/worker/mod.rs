//! Worker contract and result aggregation
//!
//! Workers are stateless: each receives a [`WorkerInput`] and produces one
//! [`WorkerResult`]. The aggregator folds a plan's results into an
//! [`AggregationResult`].

pub mod aggregation;
pub mod value_objects;

pub use aggregation::{AggregationResult, aggregate_results, extract_key_findings, quick_aggregate};
pub use value_objects::{DEPENDENCY_FAILED, StepResults, WorkerInput, WorkerResult};
