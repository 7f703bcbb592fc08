//! Human-in-the-loop entities

use crate::core::ids::short_id;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How long a confirmation stays answerable by default
pub const DEFAULT_CONFIRMATION_TTL_SECS: i64 = 5 * 60;

/// Risk of running a tool call; ordered `Low < Medium < High`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn emoji(&self) -> &str {
        match self {
            RiskLevel::Low => "🟢",
            RiskLevel::Medium => "🟡",
            RiskLevel::High => "🔴",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

/// Lifecycle of a confirmation. Only `Pending` can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ConfirmationStatus::Pending => "pending",
            ConfirmationStatus::Approved => "approved",
            ConfirmationStatus::Rejected => "rejected",
            ConfirmationStatus::Expired => "expired",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, ConfirmationStatus::Pending)
    }
}

impl std::fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tool call waiting on a user decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfirmation {
    pub id: String,
    pub tool_name: String,
    pub tool_args: Value,
    pub description: String,
    pub risk_level: RiskLevel,
    pub status: ConfirmationStatus,
    pub requested_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl ToolConfirmation {
    /// Create a pending confirmation with the default 5-minute lifetime.
    pub fn new(
        tool_name: impl Into<String>,
        tool_args: Value,
        description: impl Into<String>,
        risk_level: RiskLevel,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: short_id(),
            tool_name: tool_name.into(),
            tool_args,
            description: description.into(),
            risk_level,
            status: ConfirmationStatus::Pending,
            requested_at: now,
            expires_at: now + Duration::seconds(DEFAULT_CONFIRMATION_TTL_SECS),
            responded_at: None,
            rejection_reason: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = self.requested_at + ttl;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == ConfirmationStatus::Pending
    }

    /// Answerable: still pending and not past its deadline
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.expires_at > now
    }

    /// Still pending but past its deadline; the sweep should expire it
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.expires_at <= now
    }

    /// Whole seconds left before expiry (zero once expired)
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Session-level HITL status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitlStatus {
    #[default]
    Idle,
    AwaitingConfirmation,
    Executing,
    Completed,
    Error,
}

impl HitlStatus {
    pub fn as_str(&self) -> &str {
        match self {
            HitlStatus::Idle => "idle",
            HitlStatus::AwaitingConfirmation => "awaiting_confirmation",
            HitlStatus::Executing => "executing",
            HitlStatus::Completed => "completed",
            HitlStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for HitlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit record of one approved tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEntry {
    pub confirmation_id: String,
    pub tool_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionEntry {
    pub fn succeeded(
        confirmation: &ToolConfirmation,
        output: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            confirmation_id: confirmation.id.clone(),
            tool_name: confirmation.tool_name.clone(),
            success: true,
            output: Some(output.into()),
            error: None,
            executed_at: at,
        }
    }

    pub fn failed(
        confirmation: &ToolConfirmation,
        error: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            confirmation_id: confirmation.id.clone(),
            tool_name: confirmation.tool_name.clone(),
            success: false,
            output: None,
            error: Some(error.into()),
            executed_at: at,
        }
    }
}

/// Per-session HITL aggregate.
///
/// Only [`transition`](super::state_machine::transition) produces new
/// values of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitlState {
    pub status: HitlStatus,
    /// Confirmations not yet consumed by execution, in request order
    pub pending_confirmations: Vec<ToolConfirmation>,
    pub execution_history: Vec<ExecutionEntry>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl HitlState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            status: HitlStatus::Idle,
            pending_confirmations: Vec::new(),
            execution_history: Vec::new(),
            last_activity_at: now,
            error_message: None,
        }
    }

    pub fn confirmation(&self, id: &str) -> Option<&ToolConfirmation> {
        self.pending_confirmations.iter().find(|c| c.id == id)
    }

    /// Number of confirmations still waiting for a decision
    pub fn awaiting_count(&self) -> usize {
        self.pending_confirmations
            .iter()
            .filter(|c| c.is_pending())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_default_ttl_is_five_minutes() {
        let c = ToolConfirmation::new("deploy", json!({}), "ship it", RiskLevel::High, at(0));
        assert_eq!(c.expires_at, at(300));
        assert_eq!(c.id.len(), 8);
        assert!(c.is_pending());
    }

    #[test]
    fn test_validity_window() {
        let c = ToolConfirmation::new("deploy", json!({}), "", RiskLevel::High, at(0))
            .with_ttl(Duration::seconds(60));
        assert!(c.is_valid_at(at(59)));
        assert!(!c.is_valid_at(at(60)));
        assert!(c.is_stale_at(at(60)));
        assert_eq!(c.remaining_secs(at(45)), 15);
        assert_eq!(c.remaining_secs(at(90)), 0);
    }

    #[test]
    fn test_risk_ordering_and_parse() {
        assert!(RiskLevel::Low < RiskLevel::Medium && RiskLevel::Medium < RiskLevel::High);
        assert_eq!("HIGH".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert!("extreme".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_state_serializes_snake_case_status() {
        let state = HitlState::new(at(0));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "idle");
        assert!(json["pendingConfirmations"].as_array().unwrap().is_empty());
    }
}
