//! Compaction configuration

use serde::{Deserialize, Serialize};

/// Default characters-per-token ratio for estimates.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 4.0;

/// Knobs controlling when and how a conversation is compacted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Token budget of the model context window
    pub max_tokens: usize,
    /// Utilization (0..1) at which compaction starts
    pub compaction_threshold: f64,
    /// Tool results older than this many user turns are truncated; at twice
    /// this age they are cleared
    pub prune_tool_results_after: usize,
    /// Length truncated tool results are cut to
    pub max_tool_result_length: usize,
    /// Most recent messages kept verbatim when summarizing
    pub preserve_recent_messages: usize,
    pub chars_per_token: f64,
    /// Lines kept by the heuristic summarizer
    pub summary_max_lines: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            max_tokens: 128_000,
            compaction_threshold: 0.8,
            prune_tool_results_after: 3,
            max_tool_result_length: 500,
            preserve_recent_messages: 10,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            summary_max_lines: 20,
        }
    }
}

impl CompactionConfig {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.compaction_threshold = threshold;
        self
    }

    pub fn with_prune_after(mut self, turns: usize) -> Self {
        self.prune_tool_results_after = turns;
        self
    }

    pub fn with_max_tool_result_length(mut self, chars: usize) -> Self {
        self.max_tool_result_length = chars;
        self
    }

    pub fn with_preserve_recent(mut self, messages: usize) -> Self {
        self.preserve_recent_messages = messages;
        self
    }

    /// Estimated tokens for `text`, rounded up.
    pub fn estimate_tokens(&self, text: &str) -> usize {
        let chars = text.chars().count();
        if chars == 0 {
            return 0;
        }
        let ratio = if self.chars_per_token > 0.0 {
            self.chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        (chars as f64 / ratio).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompactionConfig::default();
        assert_eq!(config.max_tokens, 128_000);
        assert_eq!(config.compaction_threshold, 0.8);
        assert_eq!(config.preserve_recent_messages, 10);
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        let config = CompactionConfig::default();
        assert_eq!(config.estimate_tokens(""), 0);
        assert_eq!(config.estimate_tokens("abc"), 1);
        assert_eq!(config.estimate_tokens("abcdefgh"), 2);
        assert_eq!(config.estimate_tokens("abcdefghi"), 3);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CompactionConfig = serde_json::from_str(r#"{"max_tokens": 1000}"#).unwrap();
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.summary_max_lines, 20);
    }
}
