//! Execution plan domain
//!
//! A plan is a handful of [`PlanStep`]s with declared dependencies. Plans
//! come from an LLM ([`parse_plan`]) or a fixed [`template_plan`], are
//! checked by [`validate_plan_dependencies`], shrunk by [`optimize_plan`],
//! and executed level by level as produced by [`group_steps_by_level`].

pub mod entities;
pub mod optimization;
pub mod plan_parser;
pub mod templates;
pub mod validation;

pub use entities::{ExecutionPlan, ExpectedOutput, PlanStep, StepId, WorkerType};
pub use optimization::{LivenessPolicy, optimize_plan};
pub use plan_parser::{parse_plan, parse_plan_json};
pub use templates::{template_for, template_plan};
pub use validation::{group_steps_by_level, validate_plan_dependencies};
