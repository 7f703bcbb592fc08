//! Infrastructure layer for conductor
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: configuration file loading, JSONL persistence of
//! compaction summaries and the throttled heartbeat.

pub mod config;
pub mod heartbeat;
pub mod persistence;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileClassifierConfig, FileCompactionConfig, FileConfig,
    FileExecutorConfig, FileHeartbeatConfig, FileHitlConfig, FilePersistenceConfig,
};
pub use heartbeat::{HeartbeatSnapshot, ThrottledHeartbeat};
pub use persistence::{CompactionRecord, JsonlCompactionStore};
