//! Plan optimization: de-duplication, dead-step elimination and level ordering.

use super::entities::{ExecutionPlan, PlanStep, StepId};
use super::validation::group_steps_by_level;
use crate::core::error::PlanValidationError;
use std::collections::{HashMap, HashSet};

/// Which step outputs the aggregator consumes.
///
/// Dead-step elimination only removes steps that no live output
/// (transitively) depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LivenessPolicy {
    /// Every step's output reaches the aggregator; nothing is dead.
    #[default]
    AllOutputs,
    /// Only these steps' outputs are consumed.
    Outputs(HashSet<StepId>),
}

impl LivenessPolicy {
    pub fn outputs<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StepId>,
    {
        LivenessPolicy::Outputs(ids.into_iter().map(Into::into).collect())
    }
}

/// Produce a smaller, level-ordered equivalent of `plan`.
///
/// 1. Steps doing identical work (same task, description, output, worker
///    and dependencies) collapse into the first occurrence; dependents are
///    rewired onto the survivor.
/// 2. Under [`LivenessPolicy::Outputs`], steps that no live output depends
///    on are dropped. If none of the named outputs exist, nothing is dropped.
/// 3. Steps are reordered level by level so independent steps sit together.
pub fn optimize_plan(
    plan: &ExecutionPlan,
    policy: &LivenessPolicy,
) -> Result<ExecutionPlan, PlanValidationError> {
    let levels = group_steps_by_level(plan)?;

    // Walking in level order means every dependency is already canonical
    // by the time a step is compared.
    let mut survivors: Vec<PlanStep> = Vec::with_capacity(plan.len());
    let mut renamed: HashMap<StepId, StepId> = HashMap::new();
    for step in levels.into_iter().flatten() {
        let mut step = step.clone();
        let mut rewired = Vec::with_capacity(step.depends_on.len());
        for dep in step.depends_on.drain(..) {
            let dep = renamed.get(&dep).cloned().unwrap_or(dep);
            if !rewired.contains(&dep) {
                rewired.push(dep);
            }
        }
        step.depends_on = rewired;

        match survivors.iter().find(|s| s.same_work_as(&step)) {
            Some(existing) => {
                renamed.insert(step.id.clone(), existing.id.clone());
            }
            None => survivors.push(step),
        }
    }

    let live = live_steps(&survivors, policy, &renamed);
    let steps = survivors
        .into_iter()
        .filter(|s| live.as_ref().is_none_or(|live| live.contains(&s.id)))
        .collect();

    Ok(ExecutionPlan {
        objective: plan.objective.clone(),
        steps,
    })
}

/// Live step ids, or `None` when everything is live.
fn live_steps(
    steps: &[PlanStep],
    policy: &LivenessPolicy,
    renamed: &HashMap<StepId, StepId>,
) -> Option<HashSet<StepId>> {
    let LivenessPolicy::Outputs(outputs) = policy else {
        return None;
    };

    let by_id: HashMap<&StepId, &PlanStep> = steps.iter().map(|s| (&s.id, s)).collect();
    let mut stack: Vec<StepId> = outputs
        .iter()
        .map(|id| renamed.get(id).cloned().unwrap_or_else(|| id.clone()))
        .filter(|id| by_id.contains_key(id))
        .collect();
    if stack.is_empty() {
        return None;
    }

    let mut live = HashSet::new();
    while let Some(id) = stack.pop() {
        if !live.insert(id.clone()) {
            continue;
        }
        if let Some(step) = by_id.get(&id) {
            stack.extend(step.depends_on.iter().cloned());
        }
    }
    Some(live)
}
