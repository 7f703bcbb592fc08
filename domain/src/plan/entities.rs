//! Plan domain entities

use crate::classification::QueryCategory;
use serde::{Deserialize, Serialize};

/// Identifier of a step within one plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for StepId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape of the output a step is expected to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutput {
    Code,
    Data,
    Action,
    #[default]
    Text,
}

impl ExpectedOutput {
    pub fn as_str(&self) -> &str {
        match self {
            ExpectedOutput::Code => "code",
            ExpectedOutput::Data => "data",
            ExpectedOutput::Action => "action",
            ExpectedOutput::Text => "text",
        }
    }

    /// Lenient parse used for LLM-produced plans; unknown values become `Text`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "code" => ExpectedOutput::Code,
            "data" | "json" => ExpectedOutput::Data,
            "action" => ExpectedOutput::Action,
            _ => ExpectedOutput::Text,
        }
    }
}

impl std::fmt::Display for ExpectedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Specialized worker a step is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    Code,
    Research,
    Github,
    #[default]
    General,
}

impl WorkerType {
    pub fn as_str(&self) -> &str {
        match self {
            WorkerType::Code => "code",
            WorkerType::Research => "research",
            WorkerType::Github => "github",
            WorkerType::General => "general",
        }
    }

    pub fn all() -> [WorkerType; 4] {
        [
            WorkerType::Code,
            WorkerType::Research,
            WorkerType::Github,
            WorkerType::General,
        ]
    }

    /// Lenient parse used for LLM-produced plans; unknown values become `General`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "code" | "coder" | "coding" => WorkerType::Code,
            "research" | "researcher" => WorkerType::Research,
            "github" | "git" => WorkerType::Github,
            _ => WorkerType::General,
        }
    }

    /// Default worker for a message category
    pub fn for_category(category: QueryCategory) -> Self {
        match category {
            QueryCategory::Code => WorkerType::Code,
            QueryCategory::Research => WorkerType::Research,
            QueryCategory::Github => WorkerType::Github,
            QueryCategory::General | QueryCategory::Admin => WorkerType::General,
        }
    }
}

impl std::fmt::Display for WorkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of work in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: StepId,
    /// Short imperative summary
    pub task: String,
    /// Full instructions for the worker
    pub description: String,
    pub expected_output: ExpectedOutput,
    /// Steps whose results must exist before this one runs
    pub depends_on: Vec<StepId>,
    pub worker_type: WorkerType,
}

impl PlanStep {
    pub fn new(id: impl Into<StepId>, task: impl Into<String>) -> Self {
        let task = task.into();
        Self {
            id: id.into(),
            description: task.clone(),
            task,
            expected_output: ExpectedOutput::default(),
            depends_on: Vec::new(),
            worker_type: WorkerType::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_expected_output(mut self, output: ExpectedOutput) -> Self {
        self.expected_output = output;
        self
    }

    pub fn with_worker(mut self, worker_type: WorkerType) -> Self {
        self.worker_type = worker_type;
        self
    }

    pub fn with_dependency(mut self, id: impl Into<StepId>) -> Self {
        let id = id.into();
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
        }
        self
    }

    pub fn depends_on_step(&self, id: &StepId) -> bool {
        self.depends_on.contains(id)
    }

    /// Two steps do the same work if everything but the id matches.
    pub fn same_work_as(&self, other: &PlanStep) -> bool {
        self.task == other.task
            && self.description == other.description
            && self.expected_output == other.expected_output
            && self.worker_type == other.worker_type
            && self.depends_on.len() == other.depends_on.len()
            && self.depends_on.iter().all(|d| other.depends_on.contains(d))
    }
}

/// A small, dependency-ordered set of steps answering one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub objective: String,
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step(&self, id: &StepId) -> Option<&PlanStep> {
        self.steps.iter().find(|s| &s.id == id)
    }

    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps that nothing else in the plan depends on
    pub fn terminal_steps(&self) -> Vec<&PlanStep> {
        self.steps
            .iter()
            .filter(|s| !self.steps.iter().any(|other| other.depends_on_step(&s.id)))
            .collect()
    }
}
