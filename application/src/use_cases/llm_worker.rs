//! LLM-backed worker.
//!
//! Runs a single plan step through an [`LlmProvider`] with a system prompt
//! specialised to the worker type. Dependency results are rendered into the
//! user message so the step sees exactly what it declared.

use crate::ports::llm_provider::LlmProvider;
use crate::ports::worker_dispatcher::{DispatchError, WorkerDispatcher};
use async_trait::async_trait;
use conductor_domain::util::truncate_with_marker;
use conductor_domain::{Message, WorkerInput, WorkerResult, WorkerType};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Longest dependency output copied into a step prompt
const MAX_DEPENDENCY_CHARS: usize = 4_000;

/// Default system prompt for a worker type.
pub fn default_worker_prompt(worker_type: WorkerType) -> &'static str {
    match worker_type {
        WorkerType::Code => {
            "You are a software engineering worker. Read the step carefully, reason about the code involved, \
             and answer with concrete code or precise technical findings."
        }
        WorkerType::Research => {
            "You are a research worker. Gather and compare relevant facts for the step. \
             State findings as bullet points and say where each one comes from."
        }
        WorkerType::Github => {
            "You are a GitHub worker. Work out which repositories, issues, pull requests or files the step \
             is about and describe exactly what should be read or changed."
        }
        WorkerType::General => {
            "You are a general assistant worker. Complete the step and answer clearly and concisely."
        }
    }
}

/// Render the user message for one step.
pub fn render_step_prompt(input: &WorkerInput) -> String {
    let step = &input.step;
    let mut prompt = format!("Task: {}\n", step.task);
    if step.description != step.task {
        prompt.push_str(&format!("Details: {}\n", step.description));
    }
    prompt.push_str(&format!("Expected output: {}\n", step.expected_output));

    // Declared order keeps prompts stable across runs.
    let mut rendered_any = false;
    for dep in &step.depends_on {
        let Some(result) = input.dependency_results.get(dep) else {
            continue;
        };
        if !rendered_any {
            prompt.push_str("\nResults from earlier steps:\n");
            rendered_any = true;
        }
        let text = result.data_text().unwrap_or_default();
        prompt.push_str(&format!(
            "### {}\n{}\n",
            dep,
            truncate_with_marker(text.trim(), MAX_DEPENDENCY_CHARS)
        ));
    }

    if !input.context.trim().is_empty() {
        prompt.push_str(&format!("\nConversation context:\n{}\n", input.context.trim()));
    }
    prompt
}

/// A worker that answers a step with one LLM call
pub struct LlmWorker {
    provider: Arc<dyn LlmProvider>,
    system_prompt: Option<String>,
}

impl LlmWorker {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            system_prompt: None,
        }
    }

    /// Use one system prompt for every worker type.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[async_trait]
impl WorkerDispatcher for LlmWorker {
    async fn dispatch(
        &self,
        worker_type: WorkerType,
        input: WorkerInput,
    ) -> Result<WorkerResult, DispatchError> {
        let system = self
            .system_prompt
            .as_deref()
            .unwrap_or_else(|| default_worker_prompt(worker_type));
        let messages = [Message::system(system), Message::user(render_step_prompt(&input))];

        debug!(
            "LLM worker ({}) running step {} [trace {}]",
            worker_type, input.step.id, input.trace_id
        );
        let started = Instant::now();
        let response = self.provider.chat(&messages, &[]).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if response.content.trim().is_empty() {
            return Err(DispatchError::Failed("empty response from model".into()));
        }
        Ok(WorkerResult::success(
            input.step.id.clone(),
            response.content,
            elapsed_ms,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;
    use conductor_domain::{PlanStep, StepResults};

    fn input_with_dependency() -> WorkerInput {
        let step = PlanStep::new("write", "Write the summary")
            .with_description("Summarise both reviews")
            .with_dependency("a");
        let mut results = StepResults::new();
        results.insert("a".into(), WorkerResult::success("a", "- Postgres is faster", 5));
        results.insert("z".into(), WorkerResult::success("z", "unrelated", 5));
        WorkerInput::for_step(&step, &results, "user is on Linux", "t-1")
    }

    #[test]
    fn test_prompt_includes_only_declared_dependencies() {
        let prompt = render_step_prompt(&input_with_dependency());
        assert!(prompt.starts_with("Task: Write the summary\nDetails: Summarise both reviews\n"));
        assert!(prompt.contains("### a\n- Postgres is faster"));
        assert!(!prompt.contains("unrelated"));
        assert!(prompt.contains("Conversation context:\nuser is on Linux"));
    }

    #[tokio::test]
    async fn test_worker_returns_model_output() {
        let provider = Arc::new(ScriptedProvider::replying(&["Postgres wins."]));
        let worker = LlmWorker::new(provider.clone());

        let result = worker
            .dispatch(WorkerType::Research, input_with_dependency())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.step_id.as_str(), "write");
        assert_eq!(result.data_text().as_deref(), Some("Postgres wins."));
        let requests = provider.requests.lock().unwrap();
        assert_eq!(
            requests[0][0].content,
            default_worker_prompt(WorkerType::Research)
        );
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let worker = LlmWorker::new(Arc::new(ScriptedProvider::failing()));
        let err = worker
            .dispatch(WorkerType::General, input_with_dependency())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Provider(_)));
    }

    #[tokio::test]
    async fn test_blank_output_is_failure() {
        let worker = LlmWorker::new(Arc::new(ScriptedProvider::replying(&["  "])));
        let err = worker
            .dispatch(WorkerType::General, input_with_dependency())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Failed(_)));
    }
}
