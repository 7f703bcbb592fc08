//! Application layer for conductor
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{ClassifierParams, ExecutionParams, HitlParams, OrchestratorConfig};
pub use ports::{
    context_persistence::{ContextPersistence, NoPersistence, PersistError},
    heartbeat::{Heartbeat, NoHeartbeat},
    llm_provider::{ChatResponse, LlmProvider, ProviderError, ToolCallRequest},
    progress::{ProgressEvent, ProgressReceiver, ProgressSender, progress_channel},
    summarizer::{HeuristicSummarizer, LlmSummarizer, SummarizeError, Summarizer},
    worker_dispatcher::{DispatchError, WorkerDispatcher},
};
pub use use_cases::classify_query::{
    ClassificationError, ClassificationOutcome, ClassificationTier, ClassifyQueryUseCase,
};
pub use use_cases::compact_context::{CompactContextInput, CompactContextUseCase};
pub use use_cases::create_plan::{CreatePlanUseCase, PlanSource, PlannedWork, PlanningError};
pub use use_cases::execute_plan::{ExecutePlanError, ExecutePlanInput, ExecutePlanUseCase};
pub use use_cases::hitl_gate::{GateDecision, HitlGate, ReplyOutcome};
pub use use_cases::llm_worker::LlmWorker;
pub use use_cases::orchestrator::{
    MessageOrchestrator, OrchestratorError, OrchestratorResponse, ToolCallGate,
};
pub use use_cases::session_registry::{SessionRegistry, SharedSession};
pub use use_cases::worker_registry::WorkerRegistry;
