//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters and embedding
//! applications must implement.

pub mod context_persistence;
pub mod heartbeat;
pub mod llm_provider;
pub mod progress;
pub mod summarizer;
pub mod worker_dispatcher;
