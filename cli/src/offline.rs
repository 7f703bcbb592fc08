//! Offline worker used by the `session` command.
//!
//! Answers every step from its own description so the whole pipeline can be
//! exercised without a model.

use async_trait::async_trait;
use conductor_application::{DispatchError, WorkerDispatcher};
use conductor_domain::{WorkerInput, WorkerResult, WorkerType};

pub struct OfflineWorker;

#[async_trait]
impl WorkerDispatcher for OfflineWorker {
    async fn dispatch(
        &self,
        worker_type: WorkerType,
        input: WorkerInput,
    ) -> Result<WorkerResult, DispatchError> {
        let step = &input.step;
        let mut text = format!("- {} ({} worker): {}", step.task, worker_type, step.description);
        for dep in &step.depends_on {
            if input.dependency_results.contains_key(dep) {
                text.push_str(&format!("\n- uses output of {}", dep));
            }
        }
        Ok(WorkerResult::success(step.id.clone(), text, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::{PlanStep, StepResults};

    #[tokio::test]
    async fn test_offline_worker_echoes_step() {
        let step = PlanStep::new("b", "Analyse")
            .with_description("look closer")
            .with_dependency("a");
        let mut results = StepResults::new();
        results.insert("a".into(), WorkerResult::success("a", "found", 1));
        let input = WorkerInput::for_step(&step, &results, "", "t");

        let result = OfflineWorker
            .dispatch(WorkerType::Research, input)
            .await
            .unwrap();

        let text = result.data_text().unwrap();
        assert!(text.starts_with("- Analyse (research worker): look closer"));
        assert!(text.contains("uses output of a"));
    }
}
