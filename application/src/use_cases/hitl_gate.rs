//! HITL gate service.
//!
//! Wraps the pure confirmation reducer with the decisions a delivery layer
//! needs: whether a tool call must wait for approval, how a user's reply or
//! button press maps onto reducer events, and how executions are recorded.
//! Every method takes and returns [`HitlState`] by value; the caller owns
//! the per-session state.

use chrono::{DateTime, Utc};
use conductor_domain::DomainError;
use conductor_domain::hitl::{
    ConfirmationPrompt, ConfirmationStatus, ExecutionEntry, HitlEvent, HitlState, ReplyDecision,
    RiskLevel, ToolConfirmation, determine_risk_level, format_confirmation_prompt,
    get_expired_confirmation_ids, get_pending_confirmations, parse_callback, parse_reply,
    sweep_expired, transition_at,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::HitlParams;

/// Result of gating a tool call
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Below the threshold; run it now.
    Allowed { risk: RiskLevel },
    /// A confirmation was requested; `state` already contains it.
    ConfirmationRequired {
        state: HitlState,
        confirmation: ToolConfirmation,
    },
}

/// Result of applying a reply or callback
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyOutcome {
    pub state: HitlState,
    pub decision: ReplyDecision,
    /// Confirmations this reply approved; ready to execute
    pub approved: Vec<ToolConfirmation>,
    pub rejected: Vec<ToolConfirmation>,
    /// Confirmations the user tried to approve after their deadline
    pub expired: Vec<ToolConfirmation>,
    /// Acknowledgement for the user
    pub message: String,
}

impl ReplyOutcome {
    fn unchanged(state: &HitlState, decision: ReplyDecision, message: impl Into<String>) -> Self {
        Self {
            state: state.clone(),
            decision,
            approved: Vec::new(),
            rejected: Vec::new(),
            expired: Vec::new(),
            message: message.into(),
        }
    }

    pub fn changed_anything(&self) -> bool {
        !(self.approved.is_empty() && self.rejected.is_empty() && self.expired.is_empty())
    }
}

pub struct HitlGate {
    threshold: RiskLevel,
    ttl: chrono::Duration,
}

impl HitlGate {
    pub fn new(threshold: RiskLevel, ttl: chrono::Duration) -> Self {
        Self { threshold, ttl }
    }

    pub fn from_params(params: &HitlParams) -> Self {
        Self::new(params.confirmation_threshold, params.ttl())
    }

    pub fn threshold(&self) -> RiskLevel {
        self.threshold
    }

    // ==================== Gating ====================

    /// Decide whether `tool_name(args)` may run without asking.
    pub fn gate_tool_call(
        &self,
        state: &HitlState,
        tool_name: &str,
        args: Value,
        description: &str,
        now: DateTime<Utc>,
    ) -> GateDecision {
        let risk = determine_risk_level(tool_name, &args);
        if risk < self.threshold {
            debug!("Tool call {} allowed (risk {})", tool_name, risk);
            return GateDecision::Allowed { risk };
        }
        let (state, confirmation) = self.request(state, tool_name, args, description, now);
        GateDecision::ConfirmationRequired {
            state,
            confirmation,
        }
    }

    /// Request a confirmation regardless of the threshold.
    pub fn request(
        &self,
        state: &HitlState,
        tool_name: &str,
        args: Value,
        description: &str,
        now: DateTime<Utc>,
    ) -> (HitlState, ToolConfirmation) {
        let risk = determine_risk_level(tool_name, &args);
        let confirmation =
            ToolConfirmation::new(tool_name, args, description, risk, now).with_ttl(self.ttl);
        info!(
            "Confirmation {} requested for {} (risk {})",
            confirmation.id, tool_name, risk
        );
        let next = transition_at(
            state,
            HitlEvent::RequestConfirmation {
                confirmation: confirmation.clone(),
            },
            now,
        );
        (next, confirmation)
    }

    /// Prompt for everything still answerable, or `None` if nothing is.
    pub fn prompt(&self, state: &HitlState, now: DateTime<Utc>) -> Option<ConfirmationPrompt> {
        let pending = get_pending_confirmations(state, now);
        if pending.is_empty() {
            return None;
        }
        Some(format_confirmation_prompt(&pending, now))
    }

    // ==================== Replies ====================

    /// Apply a free-text reply.
    pub fn apply_reply(&self, state: &HitlState, text: &str, now: DateTime<Utc>) -> ReplyOutcome {
        self.apply_decision(state, parse_reply(text), now)
    }

    /// Apply inline-button callback data.
    pub fn apply_callback(
        &self,
        state: &HitlState,
        data: &str,
        now: DateTime<Utc>,
    ) -> ReplyOutcome {
        self.apply_decision(state, parse_callback(data), now)
    }

    pub fn apply_decision(
        &self,
        state: &HitlState,
        decision: ReplyDecision,
        now: DateTime<Utc>,
    ) -> ReplyOutcome {
        let event = match &decision {
            ReplyDecision::Unrecognized => {
                Err("I didn't catch that. Reply \"yes\" or \"no\".".to_string())
            }
            ReplyDecision::ApproveAll => Ok(HitlEvent::ApproveAll),
            ReplyDecision::RejectAll => Ok(HitlEvent::RejectAll { reason: None }),
            ReplyDecision::Approve { id } => self
                .target(state, id.as_deref())
                .map(|id| HitlEvent::UserApproved { id }),
            ReplyDecision::Reject { id, reason } => self
                .target(state, id.as_deref())
                .map(|id| HitlEvent::UserRejected {
                    id,
                    reason: reason.clone(),
                }),
        };
        let event = match event {
            Ok(event) => event,
            Err(message) => return ReplyOutcome::unchanged(state, decision, message),
        };

        debug!("Applying {} to HITL state", event.name());
        let next = transition_at(state, event, now);
        let mut outcome = ReplyOutcome::unchanged(&next, decision, String::new());

        for before in state.pending_confirmations.iter().filter(|c| c.is_pending()) {
            let Some(after) = next.confirmation(&before.id) else {
                continue;
            };
            match after.status {
                ConfirmationStatus::Approved => outcome.approved.push(after.clone()),
                ConfirmationStatus::Rejected => outcome.rejected.push(after.clone()),
                ConfirmationStatus::Expired => outcome.expired.push(after.clone()),
                ConfirmationStatus::Pending => {}
            }
        }

        outcome.message = acknowledgement(&outcome);
        info!(
            "HITL reply: {} approved, {} rejected, {} expired",
            outcome.approved.len(),
            outcome.rejected.len(),
            outcome.expired.len()
        );
        outcome
    }

    /// Resolve which confirmation a reply refers to.
    fn target(&self, state: &HitlState, id: Option<&str>) -> Result<String, String> {
        match id {
            Some(id) => match state.confirmation(id) {
                Some(c) if c.is_pending() => Ok(c.id.clone()),
                _ => Err(format!("No pending confirmation with id {}.", id)),
            },
            None => {
                let pending: Vec<&ToolConfirmation> = state
                    .pending_confirmations
                    .iter()
                    .filter(|c| c.is_pending())
                    .collect();
                match pending.as_slice() {
                    [] => Err("Nothing is waiting for your approval.".to_string()),
                    [only] => Ok(only.id.clone()),
                    _ => Err(format!(
                        "{} actions are waiting. Reply \"approve <id>\", \"reject <id>\", \"approve all\" or \"reject all\".",
                        pending.len()
                    )),
                }
            }
        }
    }

    // ==================== Expiry and execution ====================

    /// Expire every stale confirmation; returns the new state and the expired ids.
    pub fn sweep_expired(&self, state: &HitlState, now: DateTime<Utc>) -> (HitlState, Vec<String>) {
        let expired = get_expired_confirmation_ids(state, now);
        if expired.is_empty() {
            return (state.clone(), expired);
        }
        info!("Expired {} confirmation(s)", expired.len());
        (sweep_expired(state, now), expired)
    }

    /// Record the outcome of running an approved confirmation.
    pub fn record_execution(
        &self,
        state: &HitlState,
        confirmation_id: &str,
        outcome: Result<String, String>,
        now: DateTime<Utc>,
    ) -> Result<HitlState, DomainError> {
        let confirmation = state
            .confirmation(confirmation_id)
            .filter(|c| c.status == ConfirmationStatus::Approved)
            .ok_or_else(|| DomainError::ConfirmationNotFound(confirmation_id.to_string()))?;

        let started = transition_at(
            state,
            HitlEvent::ExecutionStarted {
                id: confirmation.id.clone(),
            },
            now,
        );
        let event = match outcome {
            Ok(output) => HitlEvent::ExecutionCompleted {
                entry: ExecutionEntry::succeeded(confirmation, output, now),
            },
            Err(error) => HitlEvent::ExecutionFailed {
                id: Some(confirmation.id.clone()),
                error,
            },
        };
        Ok(transition_at(&started, event, now))
    }
}

impl Default for HitlGate {
    fn default() -> Self {
        Self::from_params(&HitlParams::default())
    }
}

fn acknowledgement(outcome: &ReplyOutcome) -> String {
    let mut lines = Vec::new();
    for c in &outcome.approved {
        lines.push(format!("✅ Approved [{}] {}", c.id, c.tool_name));
    }
    for c in &outcome.rejected {
        match &c.rejection_reason {
            Some(reason) => lines.push(format!(
                "❌ Rejected [{}] {}: {}",
                c.id, c.tool_name, reason
            )),
            None => lines.push(format!("❌ Rejected [{}] {}", c.id, c.tool_name)),
        }
    }
    for c in &outcome.expired {
        lines.push(format!("⌛ [{}] {} expired before it was approved", c.id, c.tool_name));
    }
    if lines.is_empty() {
        return "Nothing is waiting for your approval.".to_string();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::hitl::{HitlStatus, get_approved_confirmations};
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn gate() -> HitlGate {
        HitlGate::new(RiskLevel::Medium, chrono::Duration::seconds(300))
    }

    fn with_pending(tools: &[&str]) -> HitlState {
        let gate = gate();
        tools.iter().fold(HitlState::new(at(0)), |state, tool| {
            gate.request(&state, tool, json!({}), "", at(0)).0
        })
    }

    #[test]
    fn test_low_risk_call_is_allowed() {
        let decision =
            gate().gate_tool_call(&HitlState::new(at(0)), "list_issues", json!({}), "", at(0));
        assert_eq!(decision, GateDecision::Allowed { risk: RiskLevel::Low });
    }

    #[test]
    fn test_high_risk_call_needs_confirmation() {
        let decision = gate().gate_tool_call(
            &HitlState::new(at(0)),
            "delete_branch",
            json!({"branch": "old"}),
            "Delete branch old",
            at(0),
        );
        let GateDecision::ConfirmationRequired { state, confirmation } = decision else {
            panic!("expected a confirmation");
        };
        assert_eq!(confirmation.risk_level, RiskLevel::High);
        assert_eq!(confirmation.expires_at, at(300));
        assert_eq!(state.status, HitlStatus::AwaitingConfirmation);
        assert_eq!(state.awaiting_count(), 1);
    }

    #[test]
    fn test_clear_command_confirmation_is_high_risk() {
        let (state, confirmation) = gate().request(
            &HitlState::new(at(0)),
            "clear",
            json!({}),
            "Clear history",
            at(0),
        );
        assert_eq!(confirmation.tool_name, "clear");
        assert_eq!(confirmation.risk_level, RiskLevel::High);
        assert!(gate().prompt(&state, at(10)).is_some());
    }

    #[test]
    fn test_yes_approves_the_only_pending() {
        let state = with_pending(&["delete_file"]);
        let outcome = gate().apply_reply(&state, "yes", at(10));

        assert_eq!(outcome.approved.len(), 1);
        assert_eq!(outcome.state.status, HitlStatus::Executing);
        assert!(outcome.message.starts_with("✅ Approved"));
        assert_eq!(get_approved_confirmations(&outcome.state).len(), 1);
    }

    #[test]
    fn test_bare_yes_is_ambiguous_with_two_pending() {
        let state = with_pending(&["delete_file", "push_commit"]);
        let outcome = gate().apply_reply(&state, "yes", at(10));

        assert!(!outcome.changed_anything());
        assert_eq!(outcome.state, state);
        assert!(outcome.message.contains("2 actions are waiting"));
    }

    #[test]
    fn test_reject_all_callback() {
        let state = with_pending(&["delete_file", "push_commit"]);
        let outcome = gate().apply_callback(&state, "hitl_reject_all", at(10));

        assert_eq!(outcome.rejected.len(), 2);
        assert!(
            outcome
                .state
                .pending_confirmations
                .iter()
                .all(|c| c.status == ConfirmationStatus::Rejected)
        );
        assert_eq!(outcome.state.status, HitlStatus::Idle);
    }

    #[test]
    fn test_approve_by_id_callback() {
        let state = with_pending(&["delete_file", "push_commit"]);
        let target = state.pending_confirmations[1].id.clone();
        let outcome = gate().apply_callback(&state, &format!("hitl_approve:{target}"), at(10));

        assert_eq!(outcome.approved.len(), 1);
        assert_eq!(outcome.approved[0].id, target);
        // The other one is still waiting.
        assert_eq!(outcome.state.status, HitlStatus::AwaitingConfirmation);
    }

    #[test]
    fn test_unknown_id_is_reported() {
        let state = with_pending(&["delete_file"]);
        let outcome = gate().apply_callback(&state, "hitl_approve:deadbeef", at(10));
        assert!(!outcome.changed_anything());
        assert!(outcome.message.contains("deadbeef"));
    }

    #[test]
    fn test_late_approval_expires() {
        let state = with_pending(&["delete_file"]);
        let outcome = gate().apply_reply(&state, "yes", at(301));

        assert!(outcome.approved.is_empty());
        assert_eq!(outcome.expired.len(), 1);
        assert!(outcome.message.contains("expired"));
    }

    #[test]
    fn test_rejection_reason_is_acknowledged() {
        let state = with_pending(&["delete_file"]);
        let id = state.pending_confirmations[0].id.clone();
        let outcome = gate().apply_reply(&state, &format!("reject {id} wrong file"), at(10));

        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.message.ends_with(": wrong file"));
    }

    #[test]
    fn test_sweep_expired() {
        let state = with_pending(&["delete_file"]);
        let (unchanged, none) = gate().sweep_expired(&state, at(100));
        assert!(none.is_empty());
        assert_eq!(unchanged, state);

        let (swept, expired) = gate().sweep_expired(&state, at(300));
        assert_eq!(expired.len(), 1);
        assert_eq!(swept.awaiting_count(), 0);
        assert!(gate().prompt(&swept, at(300)).is_none());
    }

    #[test]
    fn test_record_execution() {
        let state = with_pending(&["delete_file"]);
        let id = state.pending_confirmations[0].id.clone();
        let approved = gate().apply_reply(&state, "yes", at(10)).state;

        let done = gate()
            .record_execution(&approved, &id, Ok("deleted".into()), at(11))
            .unwrap();
        assert_eq!(done.status, HitlStatus::Completed);
        assert!(done.pending_confirmations.is_empty());
        assert_eq!(done.execution_history.len(), 1);
        assert!(done.execution_history[0].success);

        let failed = gate()
            .record_execution(&approved, &id, Err("permission denied".into()), at(11))
            .unwrap();
        assert_eq!(failed.status, HitlStatus::Error);
        assert_eq!(failed.error_message.as_deref(), Some("permission denied"));
    }

    #[test]
    fn test_record_execution_requires_approval() {
        let state = with_pending(&["delete_file"]);
        let id = state.pending_confirmations[0].id.clone();
        let err = gate()
            .record_execution(&state, &id, Ok(String::new()), at(5))
            .unwrap_err();
        assert_eq!(err, DomainError::ConfirmationNotFound(id));
    }
}
