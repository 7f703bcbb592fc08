//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application
//! parameters, collecting [`ConfigIssue`]s along the way.

mod classifier;
mod compaction;
mod executor;
mod heartbeat;
mod hitl;
mod persistence;

pub use classifier::FileClassifierConfig;
pub use compaction::FileCompactionConfig;
pub use executor::FileExecutorConfig;
pub use heartbeat::{DEFAULT_HEARTBEAT_INTERVAL_SECS, FileHeartbeatConfig};
pub use hitl::FileHitlConfig;
pub use persistence::FilePersistenceConfig;

use conductor_application::OrchestratorConfig;
use conductor_domain::ConfigIssue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("configuration has {} error(s): {}", .0.len(), join_messages(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn join_messages(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Hybrid classifier settings
    pub classifier: FileClassifierConfig,
    /// Plan executor settings
    pub executor: FileExecutorConfig,
    /// Confirmation policy
    pub hitl: FileHitlConfig,
    /// Context compaction budget
    pub compaction: FileCompactionConfig,
    /// Liveness signal throttling
    pub heartbeat: FileHeartbeatConfig,
    /// Where compaction summaries are written
    pub persistence: FilePersistenceConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.classifier.to_params().1);
        issues.extend(self.executor.to_params().1);
        issues.extend(self.hitl.to_params().1);
        issues.extend(self.compaction.to_compaction_config().1);
        issues.extend(self.heartbeat.to_interval().1);
        issues
    }

    /// Build the orchestrator configuration.
    ///
    /// Warnings are returned alongside the config; any error-severity issue
    /// fails the conversion.
    pub fn to_orchestrator_config(
        &self,
    ) -> Result<(OrchestratorConfig, Vec<ConfigIssue>), ConfigValidationError> {
        let issues = self.validate();
        let (errors, warnings): (Vec<_>, Vec<_>) =
            issues.into_iter().partition(ConfigIssue::is_error);
        if !errors.is_empty() {
            return Err(ConfigValidationError::Invalid(errors));
        }

        let config = OrchestratorConfig {
            classifier: self.classifier.to_params().0,
            execution: self.executor.to_params().0,
            hitl: self.hitl.to_params().0,
            compaction: self.compaction.to_compaction_config().0,
            ..OrchestratorConfig::default()
        };
        Ok((config, warnings))
    }
}
