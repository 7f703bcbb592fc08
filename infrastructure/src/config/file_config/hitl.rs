//! Confirmation policy from TOML (`[hitl]` section)

use conductor_application::HitlParams;
use conductor_domain::{ConfigIssue, RiskLevel};
use serde::{Deserialize, Serialize};

/// # Example
///
/// ```toml
/// [hitl]
/// confirmation_ttl_secs = 300
/// confirmation_threshold = "high"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHitlConfig {
    /// Seconds a confirmation stays answerable
    pub confirmation_ttl_secs: i64,
    /// Lowest risk level ("low", "medium", "high") that needs approval
    pub confirmation_threshold: String,
}

impl Default for FileHitlConfig {
    fn default() -> Self {
        let params = HitlParams::default();
        Self {
            confirmation_ttl_secs: params.confirmation_ttl_secs,
            confirmation_threshold: params.confirmation_threshold.as_str().to_string(),
        }
    }
}

impl FileHitlConfig {
    pub fn parse_threshold(&self) -> (RiskLevel, Option<ConfigIssue>) {
        match self.confirmation_threshold.parse::<RiskLevel>() {
            Ok(level) => (level, None),
            Err(_) => (
                HitlParams::default().confirmation_threshold,
                Some(ConfigIssue::invalid_enum(
                    "hitl.confirmation_threshold",
                    &self.confirmation_threshold,
                    &["low", "medium", "high"],
                )),
            ),
        }
    }

    pub fn to_params(&self) -> (HitlParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let (confirmation_threshold, threshold_issue) = self.parse_threshold();
        issues.extend(threshold_issue);

        let confirmation_ttl_secs = if self.confirmation_ttl_secs <= 0 {
            issues.push(ConfigIssue::constraint(
                "hitl.confirmation_ttl_secs",
                "hitl.confirmation_ttl_secs must be positive",
            ));
            HitlParams::default().confirmation_ttl_secs
        } else {
            self.confirmation_ttl_secs
        };

        (
            HitlParams {
                confirmation_ttl_secs,
                confirmation_threshold,
            },
            issues,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::Severity;

    #[test]
    fn test_hitl_config_deserialize() {
        let toml_str = r#"
[hitl]
confirmation_ttl_secs = 60
confirmation_threshold = "High"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let (params, issues) = config.hitl.to_params();
        assert!(issues.is_empty());
        assert_eq!(params.confirmation_ttl_secs, 60);
        assert_eq!(params.confirmation_threshold, RiskLevel::High);
    }

    #[test]
    fn test_unknown_threshold_warns_and_defaults() {
        let config = FileHitlConfig {
            confirmation_threshold: "extreme".to_string(),
            ..Default::default()
        };
        let (params, issues) = config.to_params();
        assert_eq!(params.confirmation_threshold, RiskLevel::Medium);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_non_positive_ttl_is_error() {
        let config = FileHitlConfig {
            confirmation_ttl_secs: 0,
            ..Default::default()
        };
        let (params, issues) = config.to_params();
        assert_eq!(params.confirmation_ttl_secs, 300);
        assert!(issues[0].is_error());
    }
}
