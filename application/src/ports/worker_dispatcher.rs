//! Worker dispatcher port
//!
//! The executor's only way of running a plan step. Implementations may run
//! the step in-process or hand it to a remote worker.

use super::llm_provider::ProviderError;
use async_trait::async_trait;
use conductor_domain::{WorkerInput, WorkerResult, WorkerType};
use thiserror::Error;

/// Errors a dispatcher can raise instead of returning a result.
///
/// The executor converts every error into a failed [`WorkerResult`] for
/// the step, so these never escape plan execution.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No worker registered for type '{0}'")]
    UnknownWorker(WorkerType),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Worker failed: {0}")]
    Failed(String),

    #[error("Timeout")]
    Timeout,
}

/// Runs one plan step on a worker of the given type
#[async_trait]
pub trait WorkerDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        worker_type: WorkerType,
        input: WorkerInput,
    ) -> Result<WorkerResult, DispatchError>;
}
