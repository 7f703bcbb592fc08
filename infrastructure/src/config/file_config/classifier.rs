//! Classifier configuration from TOML (`[classifier]` section)

use conductor_application::ClassifierParams;
use conductor_domain::ConfigIssue;
use serde::{Deserialize, Serialize};

/// Hybrid classifier settings.
///
/// # Example
///
/// ```toml
/// [classifier]
/// llm_fallback = true
/// large_context_tokens = 32000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileClassifierConfig {
    /// Ask the LLM when no fast-path rule matches
    pub llm_fallback: bool,
    /// History size at which low-complexity messages are treated as medium
    pub large_context_tokens: usize,
}

impl Default for FileClassifierConfig {
    fn default() -> Self {
        let params = ClassifierParams::default();
        Self {
            llm_fallback: params.llm_fallback,
            large_context_tokens: params.large_context_tokens,
        }
    }
}

impl FileClassifierConfig {
    pub fn to_params(&self) -> (ClassifierParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut params = ClassifierParams {
            llm_fallback: self.llm_fallback,
            large_context_tokens: self.large_context_tokens,
        };
        if self.large_context_tokens == 0 {
            issues.push(ConfigIssue::constraint(
                "classifier.large_context_tokens",
                "classifier.large_context_tokens must be greater than 0",
            ));
            params.large_context_tokens = ClassifierParams::default().large_context_tokens;
        }
        (params, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_config_deserialize() {
        let toml_str = r#"
[classifier]
llm_fallback = false
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.classifier.llm_fallback);
        assert_eq!(config.classifier.large_context_tokens, 32_000);
    }

    #[test]
    fn test_zero_large_context_is_error() {
        let config = FileClassifierConfig {
            large_context_tokens: 0,
            ..Default::default()
        };
        let (params, issues) = config.to_params();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert_eq!(params.large_context_tokens, 32_000);
    }
}
