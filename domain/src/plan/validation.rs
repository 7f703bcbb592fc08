//! Plan validation and dependency levelling.
//!
//! Both operations share one Kahn's-algorithm pass: a plan is valid exactly
//! when every step can be placed in some level.

use super::entities::{ExecutionPlan, PlanStep, StepId};
use crate::core::error::PlanValidationError;
use std::collections::{HashMap, HashSet};

/// Reject plans with duplicate ids, dangling dependencies or cycles.
///
/// A step that depends on itself is reported as a cycle.
pub fn validate_plan_dependencies(plan: &ExecutionPlan) -> Result<(), PlanValidationError> {
    level_indices(plan).map(|_| ())
}

/// Group steps into dependency levels.
///
/// Level `i` holds only steps whose dependencies all sit in levels `< i`.
/// Within a level, steps keep their plan order.
pub fn group_steps_by_level(
    plan: &ExecutionPlan,
) -> Result<Vec<Vec<&PlanStep>>, PlanValidationError> {
    let levels = level_indices(plan)?;
    Ok(levels
        .into_iter()
        .map(|level| level.into_iter().map(|i| &plan.steps[i]).collect())
        .collect())
}

fn level_indices(plan: &ExecutionPlan) -> Result<Vec<Vec<usize>>, PlanValidationError> {
    if plan.is_empty() {
        return Err(PlanValidationError::EmptyPlan);
    }

    let mut index: HashMap<&StepId, usize> = HashMap::with_capacity(plan.len());
    for (i, step) in plan.steps.iter().enumerate() {
        if index.insert(&step.id, i).is_some() {
            return Err(PlanValidationError::DuplicateStep(step.id.clone()));
        }
    }

    // in_degree counts distinct prerequisites; dependents is the reverse edge list
    let mut in_degree = vec![0usize; plan.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); plan.len()];
    for (i, step) in plan.steps.iter().enumerate() {
        let mut seen = HashSet::new();
        for dep in &step.depends_on {
            let Some(&j) = index.get(dep) else {
                return Err(PlanValidationError::MissingDependency {
                    step: step.id.clone(),
                    dependency: dep.clone(),
                });
            };
            if seen.insert(j) {
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut levels = Vec::new();
    let mut placed = 0;
    let mut wave: Vec<usize> = (0..plan.len()).filter(|&i| in_degree[i] == 0).collect();

    while !wave.is_empty() {
        placed += wave.len();
        let mut next = Vec::new();
        for &i in &wave {
            for &d in &dependents[i] {
                in_degree[d] -= 1;
                if in_degree[d] == 0 {
                    next.push(d);
                }
            }
        }
        next.sort_unstable();
        levels.push(wave);
        wave = next;
    }

    if placed < plan.len() {
        let steps = plan
            .steps
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, s)| s.id.clone())
            .collect();
        return Err(PlanValidationError::Cycle { steps });
    }

    Ok(levels)
}
