//! Persistence adapters: JSONL compaction summaries.
//!
//! Provides [`JsonlCompactionStore`], an append-only JSONL writer that
//! implements the [`ContextPersistence`](conductor_application::ContextPersistence) port.

mod jsonl_store;

pub use jsonl_store::{CompactionRecord, JsonlCompactionStore};
