//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod classify_query;
pub mod compact_context;
pub mod create_plan;
pub mod execute_plan;
pub mod hitl_gate;
pub mod llm_worker;
pub mod orchestrator;
pub mod session_registry;
pub mod worker_registry;
