//! User-facing confirmation prompts.
//!
//! Transport-neutral: a prompt is text plus rows of buttons whose callback
//! data round-trips through [`parse_callback`](super::response::parse_callback).

use super::entities::ToolConfirmation;
use super::response::{
    CALLBACK_APPROVE_ALL, CALLBACK_APPROVE_PREFIX, CALLBACK_REJECT_ALL, CALLBACK_REJECT_PREFIX,
};
use crate::util::truncate_str;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest argument preview shown in a prompt
const MAX_ARGS_PREVIEW: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptButton {
    pub label: String,
    pub callback_data: String,
}

impl PromptButton {
    fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPrompt {
    pub text: String,
    /// Button rows; one row per confirmation, plus a batch row when several are pending
    pub buttons: Vec<Vec<PromptButton>>,
}

/// Render the prompt for the given pending confirmations.
pub fn format_confirmation_prompt(
    pending: &[&ToolConfirmation],
    now: DateTime<Utc>,
) -> ConfirmationPrompt {
    let mut text = String::new();
    let mut buttons = Vec::new();

    if pending.len() > 1 {
        text.push_str(&format!("⚠️ {} actions need your approval\n", pending.len()));
    } else {
        text.push_str("⚠️ Approval required\n");
    }

    for confirmation in pending {
        let args = confirmation.tool_args.to_string();
        let preview = truncate_str(&args, MAX_ARGS_PREVIEW);
        let ellipsis = if preview.len() < args.len() { "…" } else { "" };

        text.push_str(&format!(
            "\n{} [{}] {} (risk: {})\n",
            confirmation.risk_level.emoji(),
            confirmation.id,
            confirmation.tool_name,
            confirmation.risk_level
        ));
        if !confirmation.description.is_empty() {
            text.push_str(&format!("{}\n", confirmation.description));
        }
        text.push_str(&format!("Args: {}{}\n", preview, ellipsis));
        text.push_str(&format!(
            "Expires in {}s\n",
            confirmation.remaining_secs(now)
        ));

        buttons.push(vec![
            PromptButton::new(
                format!("✅ Approve {}", confirmation.id),
                format!("{}{}", CALLBACK_APPROVE_PREFIX, confirmation.id),
            ),
            PromptButton::new(
                format!("❌ Reject {}", confirmation.id),
                format!("{}{}", CALLBACK_REJECT_PREFIX, confirmation.id),
            ),
        ]);
    }

    if pending.len() > 1 {
        text.push_str("\nReply \"approve <id>\", \"reject <id>\", \"approve all\" or \"reject all\".");
        buttons.push(vec![
            PromptButton::new("✅ Approve all", CALLBACK_APPROVE_ALL),
            PromptButton::new("❌ Reject all", CALLBACK_REJECT_ALL),
        ]);
    } else {
        text.push_str("\nReply \"yes\" to approve or \"no\" to reject.");
    }

    ConfirmationPrompt { text, buttons }
}
