//! Plan execution.
//!
//! Walks the plan level by level. Steps within a level are dispatched
//! concurrently (bounded by `max_parallelism`); results are committed only
//! once the whole level has finished, so no step ever sees a level-mate's
//! output. A failed step never aborts the plan: its dependents are recorded
//! as skipped without being dispatched.

use crate::ports::heartbeat::{Heartbeat, NoHeartbeat};
use crate::ports::progress::{ProgressEvent, ProgressSender};
use crate::ports::worker_dispatcher::WorkerDispatcher;
use conductor_domain::plan::{ExecutionPlan, PlanStep, StepId, group_steps_by_level};
use conductor_domain::{PlanValidationError, StepResults, WorkerInput, WorkerResult};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Worker name used for executor heartbeats
pub const EXECUTOR_HEARTBEAT_NAME: &str = "plan_executor";

#[derive(Error, Debug)]
pub enum ExecutePlanError {
    #[error("Invalid plan: {0}")]
    InvalidPlan(#[from] PlanValidationError),

    /// Cancelled between levels; `partial` holds every committed result.
    #[error("Plan execution cancelled after {} step(s)", partial.len())]
    Cancelled { partial: StepResults },
}

/// Input for one plan execution
#[derive(Debug, Clone)]
pub struct ExecutePlanInput {
    pub plan: ExecutionPlan,
    /// Conversation context handed to every worker
    pub context: String,
    pub trace_id: String,
}

impl ExecutePlanInput {
    pub fn new(plan: ExecutionPlan) -> Self {
        Self {
            plan,
            context: String::new(),
            trace_id: conductor_domain::core::ids::uuid_v4(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }
}

/// Use case for executing a validated plan through a [`WorkerDispatcher`]
pub struct ExecutePlanUseCase {
    dispatcher: Arc<dyn WorkerDispatcher>,
    max_parallelism: usize,
    heartbeat: Arc<dyn Heartbeat>,
    progress: Option<ProgressSender>,
    cancellation: Option<CancellationToken>,
}

impl ExecutePlanUseCase {
    pub fn new(dispatcher: Arc<dyn WorkerDispatcher>) -> Self {
        Self {
            dispatcher,
            max_parallelism: 4,
            heartbeat: Arc::new(NoHeartbeat),
            progress: None,
            cancellation: None,
        }
    }

    /// At least one step always runs at a time.
    pub fn with_max_parallelism(mut self, max: usize) -> Self {
        self.max_parallelism = max.max(1);
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Arc<dyn Heartbeat>) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Execute the plan and return one result per step.
    ///
    /// Only an invalid plan (before anything runs) or cancellation is an
    /// error; step failures are recorded in the result map.
    pub async fn execute(&self, input: ExecutePlanInput) -> Result<StepResults, ExecutePlanError> {
        let ExecutePlanInput {
            plan,
            context,
            trace_id,
        } = input;

        let levels: Vec<Vec<PlanStep>> = group_steps_by_level(&plan)?
            .into_iter()
            .map(|level| level.into_iter().cloned().collect())
            .collect();
        info!(
            "Executing plan '{}' ({} steps in {} levels, trace {})",
            plan.objective,
            plan.len(),
            levels.len(),
            trace_id
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallelism));
        let mut results = StepResults::new();
        let mut unsuccessful: HashSet<StepId> = HashSet::new();

        for (level_index, level) in levels.iter().enumerate() {
            if self.is_cancelled() {
                warn!(
                    "Plan execution cancelled before level {} ({} results committed)",
                    level_index,
                    results.len()
                );
                return Err(ExecutePlanError::Cancelled { partial: results });
            }

            self.notify(ProgressEvent::LevelStarted {
                level: level_index,
                steps: level.iter().map(|s| s.id.clone()).collect(),
            });
            debug!("Level {}: {} step(s)", level_index, level.len());

            let mut level_results: HashMap<StepId, WorkerResult> = HashMap::new();
            let mut join_set = JoinSet::new();

            for step in level {
                if let Some(failed_dep) = step.depends_on.iter().find(|d| unsuccessful.contains(*d))
                {
                    debug!(
                        "Skipping step {} (dependency {} did not succeed)",
                        step.id, failed_dep
                    );
                    level_results.insert(step.id.clone(), WorkerResult::skipped(step.id.clone()));
                    continue;
                }

                // Built from committed results only, never from this level.
                let worker_input =
                    WorkerInput::for_step(step, &results, context.as_str(), trace_id.as_str());
                let dispatcher = Arc::clone(&self.dispatcher);
                let semaphore = Arc::clone(&semaphore);
                let step_id = step.id.clone();
                let worker_type = step.worker_type;

                self.notify(ProgressEvent::StepStarted {
                    step_id: step_id.clone(),
                    worker_type,
                });

                join_set.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let started = Instant::now();
                    let outcome = dispatcher.dispatch(worker_type, worker_input).await;
                    let elapsed_ms = started.elapsed().as_millis() as u64;

                    let result = match outcome {
                        Ok(mut result) => {
                            result.step_id = step_id.clone();
                            if result.duration_ms == 0 {
                                result.duration_ms = elapsed_ms;
                            }
                            result
                        }
                        Err(e) => WorkerResult::failure(step_id.clone(), e.to_string(), elapsed_ms),
                    };
                    (step_id, result)
                });
            }

            // Level barrier: wait for every dispatched step before committing.
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((step_id, result)) => {
                        level_results.insert(step_id, result);
                    }
                    Err(e) => warn!("Step task join error: {}", e),
                }
            }

            for step in level {
                let result = level_results.remove(&step.id).unwrap_or_else(|| {
                    WorkerResult::failure(step.id.clone(), "worker task did not complete", 0)
                });
                self.report(&result);
                if !result.success {
                    unsuccessful.insert(step.id.clone());
                }
                results.insert(step.id.clone(), result);
            }

            self.heartbeat
                .emit(
                    EXECUTOR_HEARTBEAT_NAME,
                    json!({
                        "trace_id": trace_id,
                        "level": level_index,
                        "levels": levels.len(),
                        "completed_steps": results.len(),
                        "total_steps": plan.len(),
                    }),
                    false,
                )
                .await;
        }

        let failed = unsuccessful.len();
        let succeeded = results.len() - failed;
        self.notify(ProgressEvent::PlanCompleted { succeeded, failed });
        self.heartbeat
            .emit(
                EXECUTOR_HEARTBEAT_NAME,
                json!({
                    "trace_id": trace_id,
                    "completed_steps": results.len(),
                    "failed_steps": failed,
                    "done": true,
                }),
                true,
            )
            .await;
        info!(
            "Plan '{}' finished: {} succeeded, {} failed or skipped",
            plan.objective, succeeded, failed
        );

        Ok(results)
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn report(&self, result: &WorkerResult) {
        let event = if result.is_skipped() {
            ProgressEvent::StepSkipped {
                step_id: result.step_id.clone(),
            }
        } else if result.success {
            ProgressEvent::StepCompleted {
                step_id: result.step_id.clone(),
                duration_ms: result.duration_ms,
            }
        } else {
            let error = result.error.clone().unwrap_or_default();
            warn!("Step {} failed: {}", result.step_id, error);
            ProgressEvent::StepFailed {
                step_id: result.step_id.clone(),
                error,
            }
        };
        self.notify(event);
    }

    fn notify(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress
            && progress.send(event).is_err()
        {
            debug!("Progress receiver dropped; continuing without progress events");
        }
    }
}
