//! Plan executor configuration from TOML (`[executor]` section)

use conductor_application::ExecutionParams;
use conductor_domain::ConfigIssue;
use serde::{Deserialize, Serialize};

/// # Example
///
/// ```toml
/// [executor]
/// max_parallelism = 8
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutorConfig {
    /// Steps dispatched at once within one dependency level
    pub max_parallelism: usize,
}

impl Default for FileExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallelism: ExecutionParams::default().max_parallelism,
        }
    }
}

impl FileExecutorConfig {
    pub fn to_params(&self) -> (ExecutionParams, Vec<ConfigIssue>) {
        if self.max_parallelism == 0 {
            return (
                ExecutionParams::default(),
                vec![ConfigIssue::constraint(
                    "executor.max_parallelism",
                    "executor.max_parallelism must be at least 1",
                )],
            );
        }
        (
            ExecutionParams {
                max_parallelism: self.max_parallelism,
            },
            vec![],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_config_default() {
        assert_eq!(FileExecutorConfig::default().max_parallelism, 4);
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let (params, issues) = FileExecutorConfig { max_parallelism: 0 }.to_params();
        assert_eq!(params.max_parallelism, 4);
        assert_eq!(issues[0].code.field(), "executor.max_parallelism");
    }
}
