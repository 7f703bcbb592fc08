//! Parsing user replies and button callbacks into confirmation decisions.

use crate::util::normalize;
use regex::Regex;
use std::sync::LazyLock;

pub const CALLBACK_APPROVE_PREFIX: &str = "hitl_approve:";
pub const CALLBACK_REJECT_PREFIX: &str = "hitl_reject:";
pub const CALLBACK_APPROVE_ALL: &str = "hitl_approve_all";
pub const CALLBACK_REJECT_ALL: &str = "hitl_reject_all";

const APPROVAL_TOKENS: &[&str] = &[
    "yes", "y", "yep", "yeah", "ok", "okay", "approve", "approved", "proceed", "confirm",
    "confirmed", "go", "go ahead", "do it", "sure", "lgtm", "👍", "✅", "🆗", "✔️", "✔",
];

const REJECTION_TOKENS: &[&str] = &[
    "no", "n", "nope", "nah", "cancel", "reject", "rejected", "stop", "deny", "abort", "don't",
    "dont", "do not", "halt", "👎", "❌", "🛑", "✖️", "✖", "🚫",
];

const APPROVE_ALL_PHRASES: &[&str] = &[
    "approve all",
    "yes to all",
    "yes all",
    "approve everything",
    "confirm all",
];

const REJECT_ALL_PHRASES: &[&str] = &[
    "reject all",
    "no to all",
    "cancel all",
    "reject everything",
    "deny all",
];

/// `approve <id>` / `reject <id> [reason]`. Ids are hex or contain a digit,
/// which keeps "yes please" from reading as an id.
static ID_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(approve|confirm|yes|ok|reject|deny|cancel|no)\s+#?([0-9a-f]{6,}|[a-z0-9_-]*[0-9][a-z0-9_-]*)(?:\s*[:\-]?\s+(.+))?$")
        .unwrap()
});

/// What a reply asks the HITL gate to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyDecision {
    /// Approve one confirmation; `None` means "the only pending one"
    Approve { id: Option<String> },
    Reject {
        id: Option<String>,
        reason: Option<String>,
    },
    ApproveAll,
    RejectAll,
    /// Not a confirmation reply
    Unrecognized,
}

impl ReplyDecision {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, ReplyDecision::Unrecognized)
    }
}

fn strip_trailing_punctuation(s: &str) -> &str {
    s.trim_end_matches(['!', '.', ',', '?', ' '])
}

/// Parse a free-text reply.
pub fn parse_reply(text: &str) -> ReplyDecision {
    let normalized = normalize(text);
    let bare = strip_trailing_punctuation(&normalized);
    if bare.is_empty() {
        return ReplyDecision::Unrecognized;
    }

    if APPROVE_ALL_PHRASES.contains(&bare) {
        return ReplyDecision::ApproveAll;
    }
    if REJECT_ALL_PHRASES.contains(&bare) {
        return ReplyDecision::RejectAll;
    }
    if APPROVAL_TOKENS.contains(&bare) {
        return ReplyDecision::Approve { id: None };
    }
    if REJECTION_TOKENS.contains(&bare) {
        return ReplyDecision::Reject {
            id: None,
            reason: None,
        };
    }

    // Keep the original casing of the reason
    let original = text.trim();
    if let Some(caps) = ID_REPLY.captures(original) {
        let verb = caps[1].to_lowercase();
        let id = caps[2].to_string();
        let reason = caps.get(3).map(|m| m.as_str().trim().to_string());
        return match verb.as_str() {
            "approve" | "confirm" | "yes" | "ok" if reason.is_none() => {
                ReplyDecision::Approve { id: Some(id) }
            }
            "reject" | "deny" | "cancel" | "no" => ReplyDecision::Reject {
                id: Some(id),
                reason,
            },
            _ => ReplyDecision::Unrecognized,
        };
    }

    ReplyDecision::Unrecognized
}

/// Parse inline-keyboard callback data.
pub fn parse_callback(data: &str) -> ReplyDecision {
    let data = data.trim();
    if data == CALLBACK_APPROVE_ALL {
        ReplyDecision::ApproveAll
    } else if data == CALLBACK_REJECT_ALL {
        ReplyDecision::RejectAll
    } else if let Some(id) = data.strip_prefix(CALLBACK_APPROVE_PREFIX)
        && !id.is_empty()
    {
        ReplyDecision::Approve {
            id: Some(id.to_string()),
        }
    } else if let Some(id) = data.strip_prefix(CALLBACK_REJECT_PREFIX)
        && !id.is_empty()
    {
        ReplyDecision::Reject {
            id: Some(id.to_string()),
            reason: None,
        }
    } else {
        ReplyDecision::Unrecognized
    }
}

/// Whether text reads as an answer to a confirmation prompt.
pub fn is_confirmation_reply(text: &str) -> bool {
    parse_reply(text).is_recognized()
}
