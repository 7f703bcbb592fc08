//! Plan parsing from LLM responses.
//!
//! Accepts ```` ```json ```` or ```` ```plan ```` fenced blocks, or a bare JSON
//! object. Parsing is lenient about field spelling; structural checks
//! (dangling ids, cycles) are left to
//! [`validate_plan_dependencies`](super::validation::validate_plan_dependencies).

use super::entities::{ExecutionPlan, ExpectedOutput, PlanStep, StepId, WorkerType};
use serde_json::Value;

/// Parse a plan from model response text, or `None` if no plan is found.
pub fn parse_plan(response: &str) -> Option<ExecutionPlan> {
    let mut in_block = false;
    let mut block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();
        if !in_block && (trimmed == "```json" || trimmed == "```plan") {
            in_block = true;
            block.clear();
        } else if in_block && trimmed == "```" {
            in_block = false;
            if let Ok(parsed) = serde_json::from_str::<Value>(&block)
                && let Some(plan) = parse_plan_json(&parsed)
            {
                return Some(plan);
            }
        } else if in_block {
            block.push_str(line);
            block.push('\n');
        }
    }

    let parsed = serde_json::from_str::<Value>(response.trim()).ok()?;
    parse_plan_json(&parsed)
}

/// Stringify ids that arrive as numbers; empty strings count as missing.
fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field<'a>(json: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| json.get(*key).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

/// Parse a plan from a JSON value.
///
/// Expected shape:
/// ```json
/// {
///   "objective": "string",
///   "steps": [
///     {
///       "id": "1",
///       "task": "short summary",
///       "description": "full instructions",
///       "expected_output": "code|data|action|text",
///       "depends_on": ["..."],
///       "worker_type": "code|research|github|general"
///     }
///   ]
/// }
/// ```
///
/// Missing ids default to the 1-based position. Returns `None` when there
/// is no step array or it is empty.
pub fn parse_plan_json(json: &Value) -> Option<ExecutionPlan> {
    let objective = str_field(json, &["objective", "goal"]).unwrap_or("");
    let steps = json
        .get("steps")
        .or_else(|| json.get("tasks"))
        .and_then(Value::as_array)?;
    if steps.is_empty() {
        return None;
    }

    let mut plan = ExecutionPlan::new(objective);
    for (index, step_json) in steps.iter().enumerate() {
        let id = step_json
            .get("id")
            .and_then(json_id)
            .unwrap_or_else(|| (index + 1).to_string());
        let description = str_field(step_json, &["description", "instructions"]);
        let task = str_field(step_json, &["task", "title", "name"])
            .or(description)
            .unwrap_or("No description");

        let mut step = PlanStep::new(id, task).with_description(description.unwrap_or(task));

        if let Some(output) = str_field(step_json, &["expected_output", "expectedOutput"]) {
            step = step.with_expected_output(ExpectedOutput::parse_lenient(output));
        }
        if let Some(worker) = str_field(step_json, &["worker_type", "workerType", "worker"]) {
            step = step.with_worker(WorkerType::parse_lenient(worker));
        }

        let deps = step_json
            .get("depends_on")
            .or_else(|| step_json.get("dependsOn"))
            .and_then(Value::as_array);
        for dep in deps.into_iter().flatten() {
            if let Some(dep_id) = json_id(dep) {
                step = step.with_dependency(StepId::new(dep_id));
            }
        }

        plan = plan.with_step(step);
    }

    Some(plan)
}
