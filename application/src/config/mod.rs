//! Application-level configuration.
//!
//! [`OrchestratorConfig`] groups the parameters that control how the use
//! cases behave: classifier sizing, executor parallelism, confirmation
//! policy and the compaction budget.

pub mod orchestrator_config;

pub use orchestrator_config::{ClassifierParams, ExecutionParams, HitlParams, OrchestratorConfig};
