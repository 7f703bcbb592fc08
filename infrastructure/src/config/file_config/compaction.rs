//! Context compaction configuration from TOML (`[compaction]` section)

use conductor_domain::{CompactionConfig, ConfigIssue};
use serde::{Deserialize, Serialize};

/// Context compaction settings.
///
/// # Example
///
/// ```toml
/// [compaction]
/// max_tokens = 128000
/// compaction_threshold = 0.8
/// prune_tool_results_after = 3
/// max_tool_result_length = 500
/// preserve_recent_messages = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCompactionConfig {
    pub max_tokens: usize,
    /// Utilization in (0, 1] at which compaction starts
    pub compaction_threshold: f64,
    pub prune_tool_results_after: usize,
    pub max_tool_result_length: usize,
    pub preserve_recent_messages: usize,
    pub chars_per_token: f64,
    pub summary_max_lines: usize,
}

impl Default for FileCompactionConfig {
    fn default() -> Self {
        let config = CompactionConfig::default();
        Self {
            max_tokens: config.max_tokens,
            compaction_threshold: config.compaction_threshold,
            prune_tool_results_after: config.prune_tool_results_after,
            max_tool_result_length: config.max_tool_result_length,
            preserve_recent_messages: config.preserve_recent_messages,
            chars_per_token: config.chars_per_token,
            summary_max_lines: config.summary_max_lines,
        }
    }
}

impl FileCompactionConfig {
    /// Convert to the domain [`CompactionConfig`], returning validation issues.
    ///
    /// Out-of-range values are replaced by their defaults.
    pub fn to_compaction_config(&self) -> (CompactionConfig, Vec<ConfigIssue>) {
        let defaults = CompactionConfig::default();
        let mut issues = Vec::new();

        let max_tokens = if self.max_tokens == 0 {
            issues.push(ConfigIssue::constraint(
                "compaction.max_tokens",
                "compaction.max_tokens must be greater than 0",
            ));
            defaults.max_tokens
        } else {
            self.max_tokens
        };

        let valid_threshold =
            self.compaction_threshold > 0.0 && self.compaction_threshold <= 1.0;
        let compaction_threshold = if valid_threshold {
            self.compaction_threshold
        } else {
            issues.push(ConfigIssue::constraint(
                "compaction.compaction_threshold",
                format!(
                    "compaction.compaction_threshold must be in (0, 1], got {}",
                    self.compaction_threshold
                ),
            ));
            defaults.compaction_threshold
        };

        let chars_per_token = if self.chars_per_token > 0.0 {
            self.chars_per_token
        } else {
            issues.push(ConfigIssue::constraint(
                "compaction.chars_per_token",
                "compaction.chars_per_token must be positive",
            ));
            defaults.chars_per_token
        };

        let config = CompactionConfig {
            max_tokens,
            compaction_threshold,
            prune_tool_results_after: self.prune_tool_results_after,
            max_tool_result_length: self.max_tool_result_length,
            preserve_recent_messages: self.preserve_recent_messages,
            chars_per_token,
            summary_max_lines: self.summary_max_lines,
        };
        (config, issues)
    }
}
