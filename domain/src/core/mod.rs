//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`error::PlanValidationError`]: why a plan was rejected before execution
//! - [`ids`]: generated identifiers for sessions, confirmations and traces

pub mod error;
pub mod ids;
