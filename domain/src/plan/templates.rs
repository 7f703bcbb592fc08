//! Templated plans used when no LLM plan is available.

use super::entities::{ExecutionPlan, ExpectedOutput, PlanStep, WorkerType};
use crate::classification::{Complexity, QueryCategory, QueryClassification};

/// Build the fixed plan for a category.
///
/// - research: gather → analyse → synthesise
/// - code: analyse → implement
/// - github: fetch → act
/// - general/admin: a single answering step
pub fn template_plan(task: &str, category: QueryCategory) -> ExecutionPlan {
    let plan = ExecutionPlan::new(task);
    match category {
        QueryCategory::Research => plan
            .with_step(
                PlanStep::new("gather", "Gather sources")
                    .with_description(format!("Collect relevant sources and facts for: {task}"))
                    .with_expected_output(ExpectedOutput::Data)
                    .with_worker(WorkerType::Research),
            )
            .with_step(
                PlanStep::new("analyse", "Analyse findings")
                    .with_description(format!(
                        "Compare and evaluate the gathered material for: {task}"
                    ))
                    .with_expected_output(ExpectedOutput::Data)
                    .with_worker(WorkerType::Research)
                    .with_dependency("gather"),
            )
            .with_step(
                PlanStep::new("synthesise", "Synthesise answer")
                    .with_description(format!("Write a sourced answer to: {task}"))
                    .with_expected_output(ExpectedOutput::Text)
                    .with_worker(WorkerType::General)
                    .with_dependency("analyse"),
            ),
        QueryCategory::Code => plan
            .with_step(
                PlanStep::new("analyse", "Analyse the code")
                    .with_description(format!("Work out what needs to change for: {task}"))
                    .with_expected_output(ExpectedOutput::Text)
                    .with_worker(WorkerType::Code),
            )
            .with_step(
                PlanStep::new("implement", "Implement the change")
                    .with_description(format!("Write the code for: {task}"))
                    .with_expected_output(ExpectedOutput::Code)
                    .with_worker(WorkerType::Code)
                    .with_dependency("analyse"),
            ),
        QueryCategory::Github => plan
            .with_step(
                PlanStep::new("fetch", "Fetch repository state")
                    .with_description(format!(
                        "Look up the issues, PRs or files involved in: {task}"
                    ))
                    .with_expected_output(ExpectedOutput::Data)
                    .with_worker(WorkerType::Github),
            )
            .with_step(
                PlanStep::new("act", "Carry out the request")
                    .with_description(format!("Perform the requested repository action: {task}"))
                    .with_expected_output(ExpectedOutput::Action)
                    .with_worker(WorkerType::Github)
                    .with_dependency("fetch"),
            ),
        QueryCategory::General | QueryCategory::Admin => plan.with_step(
            PlanStep::new("answer", "Answer the request")
                .with_description(task)
                .with_expected_output(ExpectedOutput::Text)
                .with_worker(WorkerType::General),
        ),
    }
}

/// Template sized to the request.
///
/// A low-complexity research question gets a single lookup step instead of
/// the full research chain. Everything else uses [`template_plan`].
pub fn template_for(task: &str, classification: &QueryClassification) -> ExecutionPlan {
    if classification.category == QueryCategory::Research
        && classification.complexity == Complexity::Low
    {
        return ExecutionPlan::new(task).with_step(
            PlanStep::new("lookup", "Look it up")
                .with_description(format!("Find a short, sourced answer to: {task}"))
                .with_expected_output(ExpectedOutput::Text)
                .with_worker(WorkerType::Research),
        );
    }
    template_plan(task, classification.category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::validation::{group_steps_by_level, validate_plan_dependencies};

    #[test]
    fn test_every_template_is_valid() {
        for category in QueryCategory::all() {
            let plan = template_plan("do the thing", category);
            assert!(validate_plan_dependencies(&plan).is_ok(), "{category}");
            assert_eq!(plan.objective, "do the thing");
        }
    }

    #[test]
    fn test_research_template_is_a_chain() {
        let plan = template_plan("state of rust async", QueryCategory::Research);
        let levels = group_steps_by_level(&plan).unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[2][0].id.as_str(), "synthesise");
    }

    #[test]
    fn test_low_complexity_research_is_a_single_lookup() {
        use crate::classification::QueryType;

        let low = QueryClassification::new(
            QueryType::Complex,
            QueryCategory::Research,
            Complexity::Low,
        );
        let plan = template_for("compare frameworks", &low);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].id.as_str(), "lookup");
        assert_eq!(plan.steps[0].worker_type, WorkerType::Research);

        let medium = QueryClassification::new(
            QueryType::Complex,
            QueryCategory::Research,
            Complexity::Medium,
        );
        assert_eq!(template_for("compare frameworks", &medium).len(), 3);

        let code =
            QueryClassification::new(QueryType::Complex, QueryCategory::Code, Complexity::Low);
        assert_eq!(
            template_for("fix it", &code),
            template_plan("fix it", QueryCategory::Code)
        );
    }

    #[test]
    fn test_general_template_is_single_step() {
        let plan = template_plan("hello", QueryCategory::General);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].description, "hello");
    }

    #[test]
    fn test_github_template_workers() {
        let plan = template_plan("close stale issues", QueryCategory::Github);
        assert!(plan.steps.iter().all(|s| s.worker_type == WorkerType::Github));
        assert_eq!(plan.steps[1].expected_output, ExpectedOutput::Action);
    }
}
