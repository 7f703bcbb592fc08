//! Plan execution progress events
//!
//! The executor writes [`ProgressEvent`]s to an unbounded channel that the
//! caller drains. A closed receiver never affects execution.

use conductor_domain::{StepId, WorkerType};
use serde::Serialize;
use tokio::sync::mpsc;

/// Sending half handed to the executor
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half kept by the caller
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    LevelStarted {
        level: usize,
        steps: Vec<StepId>,
    },
    StepStarted {
        step_id: StepId,
        worker_type: WorkerType,
    },
    StepCompleted {
        step_id: StepId,
        duration_ms: u64,
    },
    StepFailed {
        step_id: StepId,
        error: String,
    },
    StepSkipped {
        step_id: StepId,
    },
    PlanCompleted {
        succeeded: usize,
        failed: usize,
    },
}

impl ProgressEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::LevelStarted { .. } => "level_started",
            ProgressEvent::StepStarted { .. } => "step_started",
            ProgressEvent::StepCompleted { .. } => "step_completed",
            ProgressEvent::StepFailed { .. } => "step_failed",
            ProgressEvent::StepSkipped { .. } => "step_skipped",
            ProgressEvent::PlanCompleted { .. } => "plan_completed",
        }
    }

    /// Step this event is about, if any
    pub fn step_id(&self) -> Option<&StepId> {
        match self {
            ProgressEvent::StepStarted { step_id, .. }
            | ProgressEvent::StepCompleted { step_id, .. }
            | ProgressEvent::StepFailed { step_id, .. }
            | ProgressEvent::StepSkipped { step_id } => Some(step_id),
            ProgressEvent::LevelStarted { .. } | ProgressEvent::PlanCompleted { .. } => None,
        }
    }
}

/// Create a progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}
