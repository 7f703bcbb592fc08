//! Context persistence port
//!
//! Best-effort, out-of-band storage for compaction summaries. Failures are
//! logged by the caller and never undo a compaction.

use async_trait::async_trait;
use conductor_domain::ContextMetrics;
use thiserror::Error;

/// Errors that can occur while saving a summary
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable sink for compaction summaries
#[async_trait]
pub trait ContextPersistence: Send + Sync {
    async fn save(
        &self,
        session_id: &str,
        summary: &str,
        metrics: &ContextMetrics,
    ) -> Result<(), PersistError>;
}

/// Persistence that discards everything
pub struct NoPersistence;

#[async_trait]
impl ContextPersistence for NoPersistence {
    async fn save(
        &self,
        _session_id: &str,
        _summary: &str,
        _metrics: &ContextMetrics,
    ) -> Result<(), PersistError> {
        Ok(())
    }
}
