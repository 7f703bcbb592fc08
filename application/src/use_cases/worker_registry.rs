//! Explicit worker registry.
//!
//! Maps each [`WorkerType`] to the dispatcher that runs it. The registry is
//! itself a [`WorkerDispatcher`], so the executor never needs to know how
//! many workers exist.

use crate::ports::llm_provider::LlmProvider;
use crate::ports::worker_dispatcher::{DispatchError, WorkerDispatcher};
use crate::use_cases::llm_worker::LlmWorker;
use async_trait::async_trait;
use conductor_domain::{WorkerInput, WorkerResult, WorkerType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Default)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerType, Arc<dyn WorkerDispatcher>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one [`LlmWorker`] serving every worker type.
    pub fn llm_backed(provider: Arc<dyn LlmProvider>) -> Self {
        let worker: Arc<dyn WorkerDispatcher> = Arc::new(LlmWorker::new(provider));
        WorkerType::all()
            .into_iter()
            .fold(Self::new(), |registry, worker_type| {
                registry.with_worker(worker_type, Arc::clone(&worker))
            })
    }

    pub fn with_worker(
        mut self,
        worker_type: WorkerType,
        worker: Arc<dyn WorkerDispatcher>,
    ) -> Self {
        self.register(worker_type, worker);
        self
    }

    /// Register (or replace) the worker for a type.
    pub fn register(&mut self, worker_type: WorkerType, worker: Arc<dyn WorkerDispatcher>) {
        self.workers.insert(worker_type, worker);
    }

    pub fn contains(&self, worker_type: WorkerType) -> bool {
        self.workers.contains_key(&worker_type)
    }

    pub fn worker_types(&self) -> Vec<WorkerType> {
        let mut types: Vec<WorkerType> = self.workers.keys().copied().collect();
        types.sort_by_key(|t| t.as_str().to_string());
        types
    }
}

#[async_trait]
impl WorkerDispatcher for WorkerRegistry {
    async fn dispatch(
        &self,
        worker_type: WorkerType,
        input: WorkerInput,
    ) -> Result<WorkerResult, DispatchError> {
        match self.workers.get(&worker_type) {
            Some(worker) => worker.dispatch(worker_type, input).await,
            None => {
                warn!(
                    "No worker registered for type '{}' (step {})",
                    worker_type, input.step.id
                );
                Ok(WorkerResult::failure(
                    input.step.id.clone(),
                    DispatchError::UnknownWorker(worker_type).to_string(),
                    0,
                ))
            }
        }
    }
}
