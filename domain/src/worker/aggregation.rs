//! Merging step results into one response.

use super::value_objects::{StepResults, WorkerResult};
use crate::plan::entities::{ExecutionPlan, PlanStep, StepId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Findings kept per result
const MAX_FINDINGS_PER_RESULT: usize = 5;
/// Findings kept across the whole aggregation
const MAX_FINDINGS_TOTAL: usize = 12;
/// Shortest line considered a finding
const MIN_FINDING_CHARS: usize = 8;

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+)$").unwrap());

static LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*)?(finding|conclusion|result|recommendation|summary|key point|important|note|answer)s?(?:\*\*)?\s*[:\-]\s*(.+)$")
        .unwrap()
});

/// Final merged output of a plan execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub response: String,
    pub key_findings: Vec<String>,
    /// True when at least one expected result is missing or failed
    pub partial_failure: bool,
    /// Failed, skipped or missing steps, in plan order
    pub failed_steps: Vec<StepId>,
    pub successful_steps: usize,
    pub total_duration_ms: u64,
}

/// Pull bullet points and labelled lines (`Finding: ...`) out of text.
pub fn extract_key_findings(text: &str) -> Vec<String> {
    let mut findings: Vec<String> = Vec::new();
    for line in text.lines() {
        let candidate = if let Some(caps) = LABELLED.captures(line) {
            caps.get(2).map(|m| m.as_str())
        } else {
            BULLET.captures(line).and_then(|caps| caps.get(1)).map(|m| m.as_str())
        };

        let Some(candidate) = candidate.map(|c| c.trim().trim_matches('*').trim()) else {
            continue;
        };
        if candidate.chars().count() < MIN_FINDING_CHARS
            || findings.iter().any(|f| f == candidate)
        {
            continue;
        }
        findings.push(candidate.to_string());
        if findings.len() == MAX_FINDINGS_PER_RESULT {
            break;
        }
    }
    findings
}

/// Merge the results of `plan` in step order.
///
/// A single-step plan takes the [`quick_aggregate`] path.
pub fn aggregate_results(results: &StepResults, plan: &ExecutionPlan) -> AggregationResult {
    if let [only] = plan.steps.as_slice() {
        return quick_aggregate(only, results.get(&only.id));
    }

    let mut sections = Vec::new();
    let mut key_findings: Vec<String> = Vec::new();
    let mut failed_steps = Vec::new();
    let mut successful_steps = 0;
    let mut total_duration_ms = 0;

    for step in &plan.steps {
        let Some(result) = results.get(&step.id) else {
            failed_steps.push(step.id.clone());
            continue;
        };
        total_duration_ms += result.duration_ms;

        if !result.success {
            failed_steps.push(step.id.clone());
            continue;
        }
        successful_steps += 1;

        let text = result.data_text().unwrap_or_default();
        if text.trim().is_empty() {
            continue;
        }
        for finding in extract_key_findings(&text) {
            if key_findings.len() < MAX_FINDINGS_TOTAL && !key_findings.contains(&finding) {
                key_findings.push(finding);
            }
        }
        sections.push(format!("## {}\n{}", step.task, text.trim()));
    }

    let mut response = sections.join("\n\n");
    if !failed_steps.is_empty() {
        if !response.is_empty() {
            response.push_str("\n\n");
        }
        response.push_str(&failure_note(&failed_steps, results));
    }

    AggregationResult {
        response,
        key_findings,
        partial_failure: !failed_steps.is_empty(),
        failed_steps,
        successful_steps,
        total_duration_ms,
    }
}

/// Aggregate a one-step plan without merging or ranking.
pub fn quick_aggregate(step: &PlanStep, result: Option<&WorkerResult>) -> AggregationResult {
    match result {
        Some(result) if result.success => {
            let response = result.data_text().unwrap_or_default();
            AggregationResult {
                key_findings: extract_key_findings(&response),
                response,
                partial_failure: false,
                failed_steps: Vec::new(),
                successful_steps: 1,
                total_duration_ms: result.duration_ms,
            }
        }
        other => {
            let error = other
                .and_then(|r| r.error.as_deref())
                .unwrap_or("no result");
            AggregationResult {
                response: format!("Step \"{}\" failed: {}", step.task, error),
                key_findings: Vec::new(),
                partial_failure: true,
                failed_steps: vec![step.id.clone()],
                successful_steps: 0,
                total_duration_ms: other.map(|r| r.duration_ms).unwrap_or(0),
            }
        }
    }
}

fn failure_note(failed: &[StepId], results: &StepResults) -> String {
    let details: Vec<String> = failed
        .iter()
        .map(|id| match results.get(id) {
            Some(r) if r.is_skipped() => format!("{} (skipped: dependency failed)", id),
            Some(r) => format!("{} ({})", id, r.error.as_deref().unwrap_or("failed")),
            None => format!("{} (no result)", id),
        })
        .collect();
    format!(
        "Note: {} step(s) did not complete: {}",
        failed.len(),
        details.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::entities::PlanStep;

    fn three_step_plan() -> ExecutionPlan {
        ExecutionPlan::new("obj")
            .with_step(PlanStep::new("A", "Gather"))
            .with_step(PlanStep::new("B", "Analyse").with_dependency("A"))
            .with_step(PlanStep::new("C", "Report").with_dependency("A"))
    }

    fn results(items: Vec<WorkerResult>) -> StepResults {
        items.into_iter().map(|r| (r.step_id.clone(), r)).collect()
    }

    #[test]
    fn test_extract_bullets_and_labels() {
        let text = "Intro line\n- Rust 2024 edition stabilised let chains\n* ok\nConclusion: tokio is the default runtime\n1. Third point is numbered";
        let findings = extract_key_findings(text);
        assert_eq!(
            findings,
            vec![
                "Rust 2024 edition stabilised let chains",
                "tokio is the default runtime",
                "Third point is numbered",
            ]
        );
    }

    #[test]
    fn test_extract_caps_and_dedupes() {
        let text = (0..10)
            .map(|i| format!("- finding number {i}"))
            .chain(std::iter::once("- finding number 0".to_string()))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(extract_key_findings(&text).len(), MAX_FINDINGS_PER_RESULT);
    }

    #[test]
    fn test_all_succeed() {
        let plan = three_step_plan();
        let r = results(vec![
            WorkerResult::success("A", "- gathered twelve sources", 10),
            WorkerResult::success("B", "analysis text", 20),
            WorkerResult::success("C", "report text", 30),
        ]);
        let agg = aggregate_results(&r, &plan);
        assert!(!agg.partial_failure);
        assert!(agg.failed_steps.is_empty());
        assert_eq!(agg.successful_steps, 3);
        assert_eq!(agg.total_duration_ms, 60);
        assert!(agg.response.starts_with("## Gather"));
        assert!(agg.response.find("## Analyse") < agg.response.find("## Report"));
        assert_eq!(agg.key_findings, vec!["gathered twelve sources"]);
    }

    #[test]
    fn test_root_failure_reports_all_failed_steps() {
        let plan = three_step_plan();
        let r = results(vec![
            WorkerResult::failure("A", "boom", 5),
            WorkerResult::skipped("B"),
            WorkerResult::skipped("C"),
        ]);
        let agg = aggregate_results(&r, &plan);
        assert!(agg.partial_failure);
        assert_eq!(
            agg.failed_steps,
            vec![StepId::new("A"), StepId::new("B"), StepId::new("C")]
        );
        assert!(agg.response.contains("A (boom)"));
        assert!(agg.response.contains("B (skipped: dependency failed)"));
    }

    #[test]
    fn test_missing_result_counts_as_failed() {
        let plan = three_step_plan();
        let r = results(vec![
            WorkerResult::success("A", "a", 1),
            WorkerResult::success("B", "b", 1),
        ]);
        let agg = aggregate_results(&r, &plan);
        assert!(agg.partial_failure);
        assert_eq!(agg.failed_steps, vec![StepId::new("C")]);
        assert!(agg.response.contains("C (no result)"));
    }

    #[test]
    fn test_single_step_uses_quick_path() {
        let plan = ExecutionPlan::new("obj").with_step(PlanStep::new("only", "Answer"));
        let r = results(vec![WorkerResult::success("only", "just the answer", 7)]);
        let agg = aggregate_results(&r, &plan);
        assert_eq!(agg.response, "just the answer");
        assert_eq!(agg.total_duration_ms, 7);
        assert!(!agg.partial_failure);
    }

    #[test]
    fn test_quick_aggregate_failure() {
        let step = PlanStep::new("only", "Answer");
        let agg = quick_aggregate(&step, Some(&WorkerResult::failure("only", "rate limited", 3)));
        assert!(agg.partial_failure);
        assert_eq!(agg.failed_steps, vec![StepId::new("only")]);
        assert!(agg.response.contains("rate limited"));

        let agg = quick_aggregate(&step, None);
        assert!(agg.response.contains("no result"));
    }
}
