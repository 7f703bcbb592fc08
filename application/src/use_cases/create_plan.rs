//! Plan creation.
//!
//! Asks the LLM for a plan, validates and optimizes it. When no LLM is
//! configured, or its reply cannot be parsed, a category template is used
//! instead. A reply that parses but does not validate is fatal.

use crate::ports::llm_provider::LlmProvider;
use conductor_domain::classification::{QueryCategory, QueryClassification};
use conductor_domain::plan::{
    ExecutionPlan, LivenessPolicy, optimize_plan, parse_plan, template_for, template_plan,
    validate_plan_dependencies,
};
use conductor_domain::{Message, PlanValidationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Invalid plan: {0}")]
    InvalidPlan(#[from] PlanValidationError),
}

/// Where a plan came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Llm,
    Template,
}

impl PlanSource {
    pub fn as_str(&self) -> &str {
        match self {
            PlanSource::Llm => "llm",
            PlanSource::Template => "template",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWork {
    pub plan: ExecutionPlan,
    pub source: PlanSource,
}

const PLANNING_PROMPT: &str = "You break a user request into a small plan of steps for specialised workers.
Worker types: code, research, github, general.
Expected outputs: code, data, action, text.
Reply with a single ```json block and nothing else:
{\"objective\": \"...\", \"steps\": [{\"id\": \"1\", \"task\": \"...\", \"description\": \"...\", \"expected_output\": \"text\", \"worker_type\": \"general\", \"depends_on\": []}]}
Only list a dependency when a step needs the other step's output. Keep the plan as short as possible.";

/// Use case for turning a classified request into an execution plan
pub struct CreatePlanUseCase {
    provider: Option<Arc<dyn LlmProvider>>,
    liveness: LivenessPolicy,
}

impl CreatePlanUseCase {
    /// Planner that only uses templates.
    pub fn new() -> Self {
        Self {
            provider: None,
            liveness: LivenessPolicy::default(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_liveness(mut self, liveness: LivenessPolicy) -> Self {
        self.liveness = liveness;
        self
    }

    /// Plan `task` for `classification`, with `context` as background.
    pub async fn execute(
        &self,
        task: &str,
        classification: &QueryClassification,
        context: &str,
    ) -> Result<PlannedWork, PlanningError> {
        let (plan, source) = match self.request_plan(task, classification, context).await {
            Some(plan) => (plan, PlanSource::Llm),
            None => (template_for(task, classification), PlanSource::Template),
        };

        validate_plan_dependencies(&plan)?;
        let optimized = optimize_plan(&plan, &self.liveness)?;
        if optimized.len() < plan.len() {
            debug!(
                "Plan optimization removed {} step(s)",
                plan.len() - optimized.len()
            );
        }
        info!(
            "Created {} plan with {} step(s) for '{}'",
            source.as_str(),
            optimized.len(),
            optimized.objective
        );
        Ok(PlannedWork {
            plan: optimized,
            source,
        })
    }

    /// Plan with the full category template, skipping the LLM.
    pub fn template(
        &self,
        task: &str,
        category: QueryCategory,
    ) -> Result<PlannedWork, PlanningError> {
        let plan = optimize_plan(&template_plan(task, category), &self.liveness)?;
        Ok(PlannedWork {
            plan,
            source: PlanSource::Template,
        })
    }

    /// The LLM's plan, or `None` when it is unavailable or unparseable.
    async fn request_plan(
        &self,
        task: &str,
        classification: &QueryClassification,
        context: &str,
    ) -> Option<ExecutionPlan> {
        let provider = self.provider.as_ref()?;

        let mut system = PLANNING_PROMPT.to_string();
        system.push_str(&format!(
            "\n\nRequest category: {}. Complexity: {}.",
            classification.category, classification.complexity
        ));
        if !context.trim().is_empty() {
            system.push_str("\n\nConversation context:\n");
            system.push_str(context);
        }
        let messages = [Message::system(system), Message::user(task)];

        match provider.chat(&messages, &[]).await {
            Ok(response) => {
                let plan = parse_plan(&response.content);
                if plan.is_none() {
                    warn!("LLM plan could not be parsed, using template");
                }
                plan
            }
            Err(e) => {
                warn!("LLM planning failed, using template: {}", e);
                None
            }
        }
    }
}

impl Default for CreatePlanUseCase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;
    use conductor_domain::classification::{Complexity, QueryType};
    use conductor_domain::plan::WorkerType;

    fn research() -> QueryClassification {
        QueryClassification::new(QueryType::Complex, QueryCategory::Research, Complexity::High)
    }

    #[tokio::test]
    async fn test_llm_plan_is_validated_and_ordered() {
        let reply = r#"```json
{"objective": "compare databases", "steps": [
  {"id": "write", "task": "Write report", "depends_on": ["a", "b"]},
  {"id": "a", "task": "Look at Postgres", "worker_type": "research"},
  {"id": "b", "task": "Look at SQLite", "worker_type": "research"}
]}
```"#;
        let provider = Arc::new(ScriptedProvider::replying(&[reply]));
        let planner = CreatePlanUseCase::new().with_provider(provider.clone());

        let work = planner
            .execute("compare databases", &research(), "")
            .await
            .unwrap();

        assert_eq!(work.source, PlanSource::Llm);
        let ids: Vec<&str> = work.plan.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "write"]);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cyclic_llm_plan_is_fatal() {
        let reply = r#"{"objective": "loop", "steps": [
  {"id": "a", "task": "first", "depends_on": ["b"]},
  {"id": "b", "task": "second", "depends_on": ["a"]}
]}"#;
        let planner = CreatePlanUseCase::new()
            .with_provider(Arc::new(ScriptedProvider::replying(&[reply])));

        let err = planner.execute("loop", &research(), "").await.unwrap_err();

        assert!(matches!(
            err,
            PlanningError::InvalidPlan(PlanValidationError::Cycle { .. })
        ));
    }

    #[tokio::test]
    async fn test_dangling_dependency_is_fatal() {
        let reply = r#"{"steps": [{"id": "a", "task": "first", "depends_on": ["ghost"]}]}"#;
        let planner = CreatePlanUseCase::new()
            .with_provider(Arc::new(ScriptedProvider::replying(&[reply])));

        let err = planner.execute("x", &research(), "").await.unwrap_err();

        assert!(matches!(
            err,
            PlanningError::InvalidPlan(PlanValidationError::MissingDependency { .. })
        ));
    }

    #[tokio::test]
    async fn test_unparseable_reply_uses_template() {
        let planner = CreatePlanUseCase::new()
            .with_provider(Arc::new(ScriptedProvider::replying(&["Sure! First I will..."])));

        let work = planner.execute("survey the field", &research(), "").await.unwrap();

        assert_eq!(work.source, PlanSource::Template);
        assert_eq!(work.plan.len(), 3);
        assert_eq!(work.plan.steps[0].worker_type, WorkerType::Research);
    }

    #[tokio::test]
    async fn test_provider_error_uses_template() {
        let planner =
            CreatePlanUseCase::new().with_provider(Arc::new(ScriptedProvider::failing()));

        let work = planner.execute("survey the field", &research(), "").await.unwrap();

        assert_eq!(work.source, PlanSource::Template);
    }

    #[tokio::test]
    async fn test_context_reaches_planner_prompt() {
        let provider = Arc::new(ScriptedProvider::replying(&["no plan"]));
        let planner = CreatePlanUseCase::new().with_provider(provider.clone());

        planner
            .execute("survey the field", &research(), "user prefers primary sources")
            .await
            .unwrap();

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0][0].content.contains("user prefers primary sources"));
        assert!(requests[0][0].content.contains("Request category: research"));
    }

    #[tokio::test]
    async fn test_template_without_provider() {
        let code =
            QueryClassification::new(QueryType::Complex, QueryCategory::Code, Complexity::Medium);
        let work = CreatePlanUseCase::new()
            .execute("fix the parser", &code, "")
            .await
            .unwrap();

        assert_eq!(work.source, PlanSource::Template);
        let ids: Vec<&str> = work.plan.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["analyse", "implement"]);
    }

    #[tokio::test]
    async fn test_low_complexity_research_template_is_one_lookup() {
        let low =
            QueryClassification::new(QueryType::Complex, QueryCategory::Research, Complexity::Low);
        let planner = CreatePlanUseCase::new();

        let work = planner.execute("compare frameworks", &low, "").await.unwrap();
        assert_eq!(work.source, PlanSource::Template);
        assert_eq!(work.plan.len(), 1);
        assert_eq!(work.plan.steps[0].id.as_str(), "lookup");

        // The full template ignores complexity.
        let full = planner
            .template("compare frameworks", QueryCategory::Research)
            .unwrap();
        assert_eq!(full.plan.len(), 3);
    }

    #[test]
    fn test_forced_template() {
        let work = CreatePlanUseCase::new()
            .template("what changed in 2024", QueryCategory::Research)
            .unwrap();
        assert_eq!(work.plan.len(), 3);
        assert_eq!(work.source, PlanSource::Template);
    }
}
