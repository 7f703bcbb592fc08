//! Context usage metrics (derived, never stored)

use super::config::CompactionConfig;
use crate::session::entities::{Message, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token estimate split by source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBreakdown {
    /// System prompt plus system-role messages (including summaries)
    pub system_prompt: usize,
    /// Tool schemas offered to the model
    pub tools: usize,
    /// User and assistant turns
    pub history: usize,
    /// Tool results
    pub retrieved: usize,
}

impl TokenBreakdown {
    pub fn total(&self) -> usize {
        self.system_prompt + self.tools + self.history + self.retrieved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetrics {
    pub total_tokens: usize,
    /// `total_tokens / max_tokens`, capped at 1.0
    pub utilization: f64,
    pub breakdown: TokenBreakdown,
    pub message_count: usize,
    pub tool_result_count: usize,
}

impl ContextMetrics {
    pub fn is_over(&self, threshold: f64) -> bool {
        self.utilization >= threshold
    }
}

/// Estimate token usage of a conversation.
pub fn monitor(
    messages: &[Message],
    system_prompt: &str,
    tools: &[Value],
    config: &CompactionConfig,
) -> ContextMetrics {
    let mut breakdown = TokenBreakdown {
        system_prompt: config.estimate_tokens(system_prompt),
        tools: tools
            .iter()
            .map(|t| config.estimate_tokens(&t.to_string()))
            .sum(),
        ..TokenBreakdown::default()
    };

    let mut tool_result_count = 0;
    for message in messages {
        let tokens = config.estimate_tokens(&message.content);
        match message.role {
            Role::System => breakdown.system_prompt += tokens,
            Role::User | Role::Assistant => breakdown.history += tokens,
            Role::Tool => {
                breakdown.retrieved += tokens;
                tool_result_count += 1;
            }
        }
    }

    let total_tokens = breakdown.total();
    let utilization = if config.max_tokens == 0 {
        if total_tokens == 0 { 0.0 } else { 1.0 }
    } else {
        (total_tokens as f64 / config.max_tokens as f64).min(1.0)
    };

    ContextMetrics {
        total_tokens,
        utilization,
        breakdown,
        message_count: messages.len(),
        tool_result_count,
    }
}
