//! Text rendering of command results.

use conductor_application::{ClassificationOutcome, OrchestratorResponse};
use conductor_domain::config::ConfigIssue;
use conductor_domain::{CompactedContext, ExecutionPlan, PlanStep, RouteTarget};

pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn classification(outcome: &ClassificationOutcome) -> String {
        let c = &outcome.classification;
        let mut out = format!(
            "type:       {}\ncategory:   {}\ncomplexity: {}\napproval:   {}\ntier:       {}",
            c.query_type,
            c.category,
            c.complexity,
            if c.requires_human_approval { "required" } else { "no" },
            outcome.tier
        );
        if !c.reasoning.is_empty() {
            out.push_str(&format!("\nreasoning:  {}", c.reasoning));
        }
        out
    }

    pub fn route(outcome: &ClassificationOutcome, target: RouteTarget) -> String {
        format!("{}\nroute:      {}", Self::classification(outcome), target)
    }

    pub fn plan_levels(plan: &ExecutionPlan, levels: &[Vec<&PlanStep>]) -> String {
        let mut out = format!("objective: {}\nsteps: {}\n", plan.objective, plan.steps.len());
        for (index, level) in levels.iter().enumerate() {
            out.push_str(&format!("\nlevel {}:\n", index));
            for step in level {
                let deps = if step.depends_on.is_empty() {
                    String::new()
                } else {
                    let ids: Vec<String> = step.depends_on.iter().map(|d| d.to_string()).collect();
                    format!(" ← {}", ids.join(", "))
                };
                out.push_str(&format!(
                    "  [{}] {} ({}, {}){}\n",
                    step.id, step.task, step.worker_type, step.expected_output, deps
                ));
            }
        }
        out
    }

    pub fn compaction(result: &CompactedContext) -> String {
        let metrics = &result.metrics;
        let mut out = format!(
            "compacted:   {}\nmessages:    {}\ntokens:      {}\nutilization: {:.1}%",
            if result.was_compacted { "yes" } else { "no" },
            metrics.message_count,
            metrics.total_tokens,
            metrics.utilization * 100.0
        );
        if let Some(stats) = &result.pruning_stats
            && !stats.is_empty()
        {
            out.push_str(&format!(
                "\npruned:      {} cleared, {} truncated, {} chars freed",
                stats.tool_results_cleared, stats.tool_results_truncated, stats.chars_freed
            ));
        }
        if result.was_summarized() {
            out.push_str(&format!("\n\nsummary:\n{}", result.summary));
        }
        out
    }

    pub fn response(response: &OrchestratorResponse) -> String {
        let mut out = format!("[{}] {}", response.route, response.text);
        for confirmation in &response.approved {
            out.push_str(&format!(
                "\n(approved for the caller: [{}] {})",
                confirmation.id, confirmation.tool_name
            ));
        }
        if response.compacted {
            out.push_str("\n(context compacted)");
        }
        out
    }

    pub fn issues(issues: &[ConfigIssue]) -> String {
        if issues.is_empty() {
            return "no issues".to_string();
        }
        issues
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
