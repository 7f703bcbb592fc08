//! Conversation context management
//!
//! [`monitor`] estimates token usage; [`compact`] (or the staged
//! [`prepare_compaction`] / [`SummaryRequest::finish`] pair) keeps the
//! conversation under budget by pruning old tool results and, if needed,
//! summarizing older turns.

pub mod compaction;
pub mod config;
pub mod metrics;
pub mod summary;

pub use compaction::{
    CLEARED_PREFIX, CompactedContext, CompactionStage, PruningStats, SummaryRequest, compact,
    prepare_compaction, prune_tool_results,
};
pub use config::{CompactionConfig, DEFAULT_CHARS_PER_TOKEN};
pub use metrics::{ContextMetrics, TokenBreakdown, monitor};
pub use summary::{SUMMARY_PREFIX, format_transcript, heuristic_summary, summary_message};
