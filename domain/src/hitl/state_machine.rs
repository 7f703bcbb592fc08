//! HITL confirmation state machine.
//!
//! [`transition`] is a pure reducer: it takes the current [`HitlState`] and
//! one [`HitlEvent`] and returns the next state. Events that refer to an
//! unknown or already-resolved confirmation return the state unchanged, so
//! replaying an event is harmless.
//!
//! ```text
//! idle ──request──▶ awaiting_confirmation ──approve──▶ executing ──complete──▶ completed
//!   ▲                   │        ▲                        │
//!   └──reject/expire────┘        └───more pending─────────┘──fail──▶ error
//! ```

use super::entities::{ConfirmationStatus, ExecutionEntry, HitlState, HitlStatus, ToolConfirmation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inputs to the reducer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HitlEvent {
    RequestConfirmation { confirmation: ToolConfirmation },
    UserApproved { id: String },
    UserRejected { id: String, reason: Option<String> },
    ConfirmationExpired { id: String },
    /// Approve every confirmation still pending
    ApproveAll,
    /// Reject every confirmation still pending
    RejectAll { reason: Option<String> },
    ExecutionStarted { id: String },
    ExecutionCompleted { entry: ExecutionEntry },
    ExecutionFailed { id: Option<String>, error: String },
    Reset,
}

impl HitlEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HitlEvent::RequestConfirmation { .. } => "REQUEST_CONFIRMATION",
            HitlEvent::UserApproved { .. } => "USER_APPROVED",
            HitlEvent::UserRejected { .. } => "USER_REJECTED",
            HitlEvent::ConfirmationExpired { .. } => "CONFIRMATION_EXPIRED",
            HitlEvent::ApproveAll => "APPROVE_ALL",
            HitlEvent::RejectAll { .. } => "REJECT_ALL",
            HitlEvent::ExecutionStarted { .. } => "EXECUTION_STARTED",
            HitlEvent::ExecutionCompleted { .. } => "EXECUTION_COMPLETED",
            HitlEvent::ExecutionFailed { .. } => "EXECUTION_FAILED",
            HitlEvent::Reset => "RESET",
        }
    }
}

/// Apply `event` at the current wall-clock time.
pub fn transition(state: &HitlState, event: HitlEvent) -> HitlState {
    transition_at(state, event, Utc::now())
}

/// Apply `event` as of `now`.
///
/// Approving a confirmation whose deadline has passed expires it instead.
pub fn transition_at(state: &HitlState, event: HitlEvent, now: DateTime<Utc>) -> HitlState {
    let mut next = state.clone();

    let changed = match event {
        HitlEvent::RequestConfirmation { confirmation } => {
            if state.confirmation(&confirmation.id).is_some() {
                false
            } else {
                // Rejected and expired entries have nothing left to do
                next.pending_confirmations.retain(|c| {
                    !matches!(
                        c.status,
                        ConfirmationStatus::Rejected | ConfirmationStatus::Expired
                    )
                });
                next.pending_confirmations.push(confirmation);
                next.status = HitlStatus::AwaitingConfirmation;
                next.error_message = None;
                true
            }
        }

        HitlEvent::UserApproved { id } => resolve(&mut next, &id, now, |c, now| {
            if c.expires_at <= now {
                c.status = ConfirmationStatus::Expired;
            } else {
                c.status = ConfirmationStatus::Approved;
                c.responded_at = Some(now);
            }
        }),

        HitlEvent::UserRejected { id, reason } => resolve(&mut next, &id, now, |c, now| {
            c.status = ConfirmationStatus::Rejected;
            c.responded_at = Some(now);
            c.rejection_reason = reason.clone();
        }),

        HitlEvent::ConfirmationExpired { id } => resolve(&mut next, &id, now, |c, _| {
            c.status = ConfirmationStatus::Expired;
        }),

        HitlEvent::ApproveAll => {
            let ids = pending_ids(&next);
            ids.iter().fold(false, |changed, id| {
                resolve(&mut next, id, now, |c, now| {
                    if c.expires_at <= now {
                        c.status = ConfirmationStatus::Expired;
                    } else {
                        c.status = ConfirmationStatus::Approved;
                        c.responded_at = Some(now);
                    }
                }) || changed
            })
        }

        HitlEvent::RejectAll { reason } => {
            let ids = pending_ids(&next);
            ids.iter().fold(false, |changed, id| {
                resolve(&mut next, id, now, |c, now| {
                    c.status = ConfirmationStatus::Rejected;
                    c.responded_at = Some(now);
                    c.rejection_reason = reason.clone();
                }) || changed
            })
        }

        HitlEvent::ExecutionStarted { id } => {
            let approved = next
                .confirmation(&id)
                .is_some_and(|c| c.status == ConfirmationStatus::Approved);
            if approved && next.status != HitlStatus::Executing {
                next.status = HitlStatus::Executing;
                true
            } else {
                false
            }
        }

        HitlEvent::ExecutionCompleted { entry } => {
            let position = next.pending_confirmations.iter().position(|c| {
                c.id == entry.confirmation_id && c.status == ConfirmationStatus::Approved
            });
            match position {
                Some(index) => {
                    next.pending_confirmations.remove(index);
                    next.execution_history.push(entry);
                    next.status = settled_status(&next, HitlStatus::Completed);
                    true
                }
                None => false,
            }
        }

        HitlEvent::ExecutionFailed { id, error } => {
            if let Some(id) = id
                && let Some(index) = next
                    .pending_confirmations
                    .iter()
                    .position(|c| c.id == id && c.status == ConfirmationStatus::Approved)
            {
                let confirmation = next.pending_confirmations.remove(index);
                next.execution_history
                    .push(ExecutionEntry::failed(&confirmation, error.clone(), now));
            }
            next.status = HitlStatus::Error;
            next.error_message = Some(error);
            true
        }

        HitlEvent::Reset => return HitlState::new(now),
    };

    if !changed {
        return state.clone();
    }
    next.last_activity_at = now;
    next
}

/// Resolve one pending confirmation and settle the session status.
///
/// Returns `false` (no change) unless the confirmation exists and is pending.
fn resolve<F>(state: &mut HitlState, id: &str, now: DateTime<Utc>, apply: F) -> bool
where
    F: FnOnce(&mut ToolConfirmation, DateTime<Utc>),
{
    let Some(confirmation) = state
        .pending_confirmations
        .iter_mut()
        .find(|c| c.id == id && c.is_pending())
    else {
        return false;
    };
    apply(confirmation, now);
    state.status = settled_status(state, HitlStatus::Idle);
    true
}

/// Status once a confirmation has been resolved or consumed.
///
/// Anything still pending keeps the session waiting; approved but unrun
/// work keeps it executing; otherwise it settles on `otherwise`.
fn settled_status(state: &HitlState, otherwise: HitlStatus) -> HitlStatus {
    let statuses = || state.pending_confirmations.iter().map(|c| c.status);
    if statuses().any(|s| s == ConfirmationStatus::Pending) {
        HitlStatus::AwaitingConfirmation
    } else if statuses().any(|s| s == ConfirmationStatus::Approved) {
        HitlStatus::Executing
    } else {
        otherwise
    }
}

fn pending_ids(state: &HitlState) -> Vec<String> {
    state
        .pending_confirmations
        .iter()
        .filter(|c| c.is_pending())
        .map(|c| c.id.clone())
        .collect()
}

// ==================== Queries ====================

/// Confirmations that can still be answered at `now`.
pub fn get_pending_confirmations(state: &HitlState, now: DateTime<Utc>) -> Vec<&ToolConfirmation> {
    state
        .pending_confirmations
        .iter()
        .filter(|c| c.is_valid_at(now))
        .collect()
}

/// Approved confirmations waiting to be executed.
pub fn get_approved_confirmations(state: &HitlState) -> Vec<&ToolConfirmation> {
    state
        .pending_confirmations
        .iter()
        .filter(|c| c.status == ConfirmationStatus::Approved)
        .collect()
}

/// Ids of pending confirmations whose deadline has passed at `now`.
pub fn get_expired_confirmation_ids(state: &HitlState, now: DateTime<Utc>) -> Vec<String> {
    state
        .pending_confirmations
        .iter()
        .filter(|c| c.is_stale_at(now))
        .map(|c| c.id.clone())
        .collect()
}

/// Fire `ConfirmationExpired` for every stale confirmation.
pub fn sweep_expired(state: &HitlState, now: DateTime<Utc>) -> HitlState {
    get_expired_confirmation_ids(state, now)
        .into_iter()
        .fold(state.clone(), |acc, id| {
            transition_at(&acc, HitlEvent::ConfirmationExpired { id }, now)
        })
}
