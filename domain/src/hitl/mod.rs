//! Human-in-the-loop (HITL) domain
//!
//! Risky tool calls become [`ToolConfirmation`]s that wait for an explicit
//! user decision. Session state changes only through the pure
//! [`transition`] reducer; expiry is swept by the caller via
//! [`sweep_expired`].

pub mod entities;
pub mod prompt;
pub mod response;
pub mod risk;
pub mod state_machine;

pub use entities::{
    ConfirmationStatus, DEFAULT_CONFIRMATION_TTL_SECS, ExecutionEntry, HitlState, HitlStatus,
    RiskLevel, ToolConfirmation,
};
pub use prompt::{ConfirmationPrompt, PromptButton, format_confirmation_prompt};
pub use response::{ReplyDecision, is_confirmation_reply, parse_callback, parse_reply};
pub use risk::{determine_risk_level, requires_confirmation};
pub use state_machine::{
    HitlEvent, get_approved_confirmations, get_expired_confirmation_ids,
    get_pending_confirmations, sweep_expired, transition, transition_at,
};
