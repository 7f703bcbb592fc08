//! Domain error types

use crate::plan::entities::StepId;
use thiserror::Error;

/// Reasons an [`ExecutionPlan`](crate::plan::ExecutionPlan) is rejected before execution.
///
/// Every variant is fatal to the plan it describes; nothing has been
/// dispatched when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanValidationError {
    #[error("Plan has no steps")]
    EmptyPlan,

    #[error("Duplicate step id: {0}")]
    DuplicateStep(StepId),

    #[error("Step {step} depends on unknown step {dependency}")]
    MissingDependency { step: StepId, dependency: StepId },

    #[error("Dependency cycle among steps: {}", format_ids(.steps))]
    Cycle { steps: Vec<StepId> },
}

fn format_ids(ids: &[StepId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid plan: {0}")]
    InvalidPlan(#[from] PlanValidationError),

    #[error("Confirmation not found: {0}")]
    ConfirmationNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DomainError {
    /// Check if this error describes a malformed plan
    pub fn is_invalid_plan(&self) -> bool {
        matches!(self, DomainError::InvalidPlan(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_display() {
        let error = PlanValidationError::Cycle {
            steps: vec![StepId::new("a"), StepId::new("b")],
        };
        assert_eq!(error.to_string(), "Dependency cycle among steps: a, b");
    }

    #[test]
    fn test_missing_dependency_display() {
        let error = PlanValidationError::MissingDependency {
            step: StepId::new("2"),
            dependency: StepId::new("9"),
        };
        assert_eq!(error.to_string(), "Step 2 depends on unknown step 9");
    }

    #[test]
    fn test_is_invalid_plan_check() {
        let error: DomainError = PlanValidationError::EmptyPlan.into();
        assert!(error.is_invalid_plan());
        assert!(!DomainError::ConfirmationNotFound("x".to_string()).is_invalid_plan());
        assert!(!DomainError::InvalidConfig("x".to_string()).is_invalid_plan());
    }
}
