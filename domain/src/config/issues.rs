//! Structured configuration issues.
//!
//! Configuration sources report problems as [`ConfigIssue`] values instead
//! of failing outright; the caller decides whether an issue is fatal.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: a default is used instead.
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A numeric value is out of its allowed range.
    InvalidConstraint { field: String },
    /// A string value is not one of the accepted names.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
}

impl ConfigIssueCode {
    pub fn field(&self) -> &str {
        match self {
            ConfigIssueCode::InvalidConstraint { field }
            | ConfigIssueCode::InvalidEnumValue { field, .. } => field,
        }
    }
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn constraint(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: ConfigIssueCode::InvalidConstraint {
                field: field.into(),
            },
            message: message.into(),
        }
    }

    pub fn invalid_enum(
        field: impl Into<String>,
        value: impl Into<String>,
        valid_values: &[&str],
    ) -> Self {
        let field = field.into();
        let value = value.into();
        let message = format!(
            "Invalid {} '{}' (valid: {}); using default",
            field,
            value,
            valid_values.join(", ")
        );
        Self {
            severity: Severity::Warning,
            code: ConfigIssueCode::InvalidEnumValue {
                field,
                value,
                valid_values: valid_values.iter().map(|v| v.to_string()).collect(),
            },
            message,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str(), self.message)
    }
}
