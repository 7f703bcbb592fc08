//! Domain layer for conductor
//!
//! This crate contains the pure core of the agent orchestration pipeline:
//! entities, value objects and side-effect-free functions. It has no
//! dependencies on async runtimes, I/O or delivery concerns.
//!
//! # Pipeline
//!
//! ```text
//! Message → Classifier → Router → ⟨HITL gate⟩ → Planner → Executor → Aggregator
//!                                                   ↑
//!                                           Context compaction
//! ```
//!
//! - [`classification`]: fast-path keyword tables plus the LLM structured-output contract
//! - [`routing`]: total decision table from classification to handler
//! - [`plan`]: plan model, validation, levelling, optimization, parsing, templates
//! - [`worker`]: step input/result contract and aggregation
//! - [`hitl`]: confirmations, risk assessment, the reducer, reply parsing
//! - [`context`]: token metrics, pruning and summarization

pub mod classification;
pub mod config;
pub mod context;
pub mod core;
pub mod hitl;
pub mod plan;
pub mod routing;
pub mod session;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use classification::{
    ClassificationContext, Complexity, QueryCategory, QueryClassification, QueryType,
    quick_classify,
};
pub use config::{ConfigIssue, ConfigIssueCode, Severity};
pub use context::{CompactedContext, CompactionConfig, ContextMetrics, PruningStats};
pub use core::error::{DomainError, PlanValidationError};
pub use hitl::{
    ConfirmationStatus, ExecutionEntry, HitlEvent, HitlState, HitlStatus, ReplyDecision,
    RiskLevel, ToolConfirmation,
};
pub use plan::{ExecutionPlan, ExpectedOutput, LivenessPolicy, PlanStep, StepId, WorkerType};
pub use routing::{RouteTarget, route};
pub use session::{Message, Role, SessionState};
pub use worker::{AggregationResult, StepResults, WorkerInput, WorkerResult};
