//! Worker contract value objects

use crate::plan::entities::{PlanStep, StepId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Error recorded on steps that never ran because a prerequisite failed.
pub const DEPENDENCY_FAILED: &str = "dependency failed";

/// Results of one plan execution, keyed by step
pub type StepResults = HashMap<StepId, WorkerResult>;

/// Outcome of executing (or skipping) one plan step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResult {
    pub step_id: StepId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl WorkerResult {
    pub fn success(step_id: impl Into<StepId>, data: impl Into<Value>, duration_ms: u64) -> Self {
        Self {
            step_id: step_id.into(),
            success: true,
            data: Some(data.into()),
            error: None,
            duration_ms,
        }
    }

    pub fn failure(
        step_id: impl Into<StepId>,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
            duration_ms,
        }
    }

    /// Result for a step whose dependency failed; the step was never dispatched.
    pub fn skipped(step_id: impl Into<StepId>) -> Self {
        Self::failure(step_id, DEPENDENCY_FAILED, 0)
    }

    pub fn is_skipped(&self) -> bool {
        !self.success && self.error.as_deref() == Some(DEPENDENCY_FAILED)
    }

    /// Render `data` as text for prompts and aggregation.
    ///
    /// Strings are used as-is; objects with a `content`, `text` or
    /// `summary` string field use that field; anything else is pretty JSON.
    pub fn data_text(&self) -> Option<String> {
        self.data.as_ref().map(render_value)
    }
}

pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => ["content", "text", "summary"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| serde_json::to_string_pretty(value).unwrap_or_default()),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

/// Everything a worker receives for one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInput {
    pub step: PlanStep,
    /// Results of this step's declared dependencies only
    pub dependency_results: StepResults,
    /// Conversation context passed down from the orchestrator
    pub context: String,
    pub trace_id: String,
}

impl WorkerInput {
    /// Build the input for `step`, restricting `all_results` to its dependencies.
    pub fn for_step(
        step: &PlanStep,
        all_results: &StepResults,
        context: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        let dependency_results = step
            .depends_on
            .iter()
            .filter_map(|id| all_results.get(id).map(|r| (id.clone(), r.clone())))
            .collect();
        Self {
            step: step.clone(),
            dependency_results,
            context: context.into(),
            trace_id: trace_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_skipped_result() {
        let r = WorkerResult::skipped("b");
        assert!(!r.success);
        assert!(r.is_skipped());
        assert_eq!(r.error.as_deref(), Some("dependency failed"));
        assert!(!WorkerResult::failure("a", "timeout", 10).is_skipped());
    }

    #[test]
    fn test_data_text_rendering() {
        assert_eq!(
            WorkerResult::success("a", "plain", 1).data_text().as_deref(),
            Some("plain")
        );
        assert_eq!(
            WorkerResult::success("a", json!({"content": "inner", "x": 1}), 1)
                .data_text()
                .as_deref(),
            Some("inner")
        );
        let text = WorkerResult::success("a", json!([1, 2]), 1).data_text().unwrap();
        assert!(text.contains('1') && text.contains('2'));
        assert!(WorkerResult::failure("a", "e", 1).data_text().is_none());
    }

    #[test]
    fn test_input_only_sees_declared_dependencies() {
        let mut all = StepResults::new();
        all.insert(StepId::new("a"), WorkerResult::success("a", "A", 1));
        all.insert(StepId::new("b"), WorkerResult::success("b", "B", 1));
        all.insert(StepId::new("c"), WorkerResult::success("c", "C", 1));

        let step = PlanStep::new("d", "combine").with_dependency("a").with_dependency("c");
        let input = WorkerInput::for_step(&step, &all, "ctx", "trace-1");

        assert_eq!(input.dependency_results.len(), 2);
        assert!(input.dependency_results.contains_key(&StepId::new("a")));
        assert!(!input.dependency_results.contains_key(&StepId::new("b")));
        assert_eq!(input.trace_id, "trace-1");
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let json = serde_json::to_value(WorkerResult::success("a", "x", 5)).unwrap();
        assert_eq!(json["stepId"], "a");
        assert_eq!(json["durationMs"], 5);
    }
}
