//! Context compaction: prune tool results, then summarize if still too large.
//!
//! Compaction is staged so the summarizer can be swapped out:
//! [`prepare_compaction`] does everything that needs no summary and either
//! finishes or returns a [`SummaryRequest`]; the caller produces a summary
//! (LLM or [`heuristic_summary`]) and calls [`SummaryRequest::finish`].
//! [`compact`] runs all stages with the heuristic summarizer.

use super::config::CompactionConfig;
use super::metrics::{ContextMetrics, monitor};
use super::summary::{format_transcript, heuristic_summary, summary_message};
use crate::session::entities::{Message, Role};
use crate::util::truncate_with_marker;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of cleared tool-result placeholders; also marks them as already pruned.
pub const CLEARED_PREFIX: &str = "[Cleared:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruningStats {
    pub tool_results_cleared: usize,
    pub tool_results_truncated: usize,
    pub chars_freed: usize,
}

impl PruningStats {
    pub fn is_empty(&self) -> bool {
        self.tool_results_cleared == 0 && self.tool_results_truncated == 0
    }
}

/// Output of a compaction pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactedContext {
    /// Summary of dropped history; empty when nothing was summarized
    pub summary: String,
    pub recent_messages: Vec<Message>,
    pub was_compacted: bool,
    /// Metrics of the resulting context
    pub metrics: ContextMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pruning_stats: Option<PruningStats>,
}

impl CompactedContext {
    pub fn was_summarized(&self) -> bool {
        !self.summary.is_empty()
    }

    /// The message list that replaces the old one.
    pub fn into_messages(self) -> Vec<Message> {
        if self.summary.is_empty() {
            return self.recent_messages;
        }
        std::iter::once(summary_message(&self.summary))
            .chain(self.recent_messages)
            .collect()
    }
}

/// Where [`prepare_compaction`] stopped
#[derive(Debug, Clone, PartialEq)]
pub enum CompactionStage {
    /// Below the threshold; nothing changed
    UnderThreshold(CompactedContext),
    /// Pruning alone was enough (or nothing older was left to summarize)
    Pruned(CompactedContext),
    /// Still over the threshold; a summary is needed to finish
    NeedsSummary(SummaryRequest),
}

/// Pruned history split into the part to summarize and the part to keep
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub older: Vec<Message>,
    pub recent: Vec<Message>,
    pub pruning_stats: PruningStats,
}

impl SummaryRequest {
    /// `[role]: content` rendering of the messages to summarize.
    pub fn transcript(&self) -> String {
        format_transcript(&self.older)
    }

    /// Replace the older messages with `summary`.
    ///
    /// An empty summary would silently drop history, so it is treated like
    /// [`without_summary`](Self::without_summary).
    pub fn finish(
        self,
        summary: impl Into<String>,
        system_prompt: &str,
        tools: &[Value],
        config: &CompactionConfig,
    ) -> CompactedContext {
        let summary = summary.into().trim().to_string();
        if summary.is_empty() {
            return self.without_summary(system_prompt, tools, config);
        }

        let messages: Vec<Message> = std::iter::once(summary_message(&summary))
            .chain(self.recent.iter().cloned())
            .collect();
        CompactedContext {
            metrics: monitor(&messages, system_prompt, tools, config),
            summary,
            recent_messages: self.recent,
            was_compacted: true,
            pruning_stats: Some(self.pruning_stats),
        }
    }

    /// Give up on summarizing and keep the pruned history as-is.
    pub fn without_summary(
        self,
        system_prompt: &str,
        tools: &[Value],
        config: &CompactionConfig,
    ) -> CompactedContext {
        let messages: Vec<Message> = self.older.into_iter().chain(self.recent).collect();
        CompactedContext {
            metrics: monitor(&messages, system_prompt, tools, config),
            recent_messages: messages,
            summary: String::new(),
            was_compacted: !self.pruning_stats.is_empty(),
            pruning_stats: Some(self.pruning_stats),
        }
    }
}

fn is_truncated(content: &str) -> bool {
    content.contains("\n[truncated ") && content.ends_with(" chars]")
}

/// Clear or truncate old tool results.
///
/// A tool result's age is the number of user messages after it. With
/// `N = prune_tool_results_after`: age ≥ 2N clears it to a placeholder;
/// N ≤ age < 2N truncates it to `max_tool_result_length`.
pub fn prune_tool_results(
    messages: &[Message],
    config: &CompactionConfig,
) -> (Vec<Message>, PruningStats) {
    let threshold = config.prune_tool_results_after;
    let mut stats = PruningStats::default();
    let mut pruned = messages.to_vec();

    let mut users_after = 0;
    for message in pruned.iter_mut().rev() {
        if message.role == Role::User {
            users_after += 1;
            continue;
        }
        if message.role != Role::Tool || message.content.starts_with(CLEARED_PREFIX) {
            continue;
        }

        let age = users_after;
        let original_chars = message.content.chars().count();

        if age >= threshold * 2 {
            let placeholder = format!(
                "{} {} result, {} chars]",
                CLEARED_PREFIX,
                message.tool_name.as_deref().unwrap_or("tool"),
                original_chars
            );
            let placeholder_chars = placeholder.chars().count();
            if placeholder_chars < original_chars {
                message.content = placeholder;
                stats.tool_results_cleared += 1;
                stats.chars_freed += original_chars - placeholder_chars;
            }
        } else if age >= threshold
            && original_chars > config.max_tool_result_length
            && !is_truncated(&message.content)
        {
            let truncated =
                truncate_with_marker(&message.content, config.max_tool_result_length);
            let truncated_chars = truncated.chars().count();
            if truncated_chars < original_chars {
                message.content = truncated;
                stats.tool_results_truncated += 1;
                stats.chars_freed += original_chars - truncated_chars;
            }
        }
    }

    (pruned, stats)
}

/// Run every stage that does not need a summary.
pub fn prepare_compaction(
    messages: &[Message],
    system_prompt: &str,
    tools: &[Value],
    config: &CompactionConfig,
) -> CompactionStage {
    let before = monitor(messages, system_prompt, tools, config);
    if !before.is_over(config.compaction_threshold) {
        return CompactionStage::UnderThreshold(CompactedContext {
            summary: String::new(),
            recent_messages: messages.to_vec(),
            was_compacted: false,
            metrics: before,
            pruning_stats: None,
        });
    }

    let (pruned, stats) = prune_tool_results(messages, config);
    let after = monitor(&pruned, system_prompt, tools, config);
    if !after.is_over(config.compaction_threshold)
        || pruned.len() <= config.preserve_recent_messages
    {
        return CompactionStage::Pruned(CompactedContext {
            summary: String::new(),
            recent_messages: pruned,
            was_compacted: !stats.is_empty(),
            metrics: after,
            pruning_stats: Some(stats),
        });
    }

    let split = pruned.len() - config.preserve_recent_messages;
    let mut older = pruned;
    let recent = older.split_off(split);
    CompactionStage::NeedsSummary(SummaryRequest {
        older,
        recent,
        pruning_stats: stats,
    })
}

/// Compact with the heuristic summarizer.
pub fn compact(
    messages: &[Message],
    system_prompt: &str,
    tools: &[Value],
    config: &CompactionConfig,
) -> CompactedContext {
    match prepare_compaction(messages, system_prompt, tools, config) {
        CompactionStage::UnderThreshold(result) | CompactionStage::Pruned(result) => result,
        CompactionStage::NeedsSummary(request) => {
            let summary = heuristic_summary(&request.transcript(), config.summary_max_lines);
            request.finish(summary, system_prompt, tools, config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1000-token window, 4 chars/token
    fn small_config() -> CompactionConfig {
        CompactionConfig::default()
            .with_max_tokens(1000)
            .with_threshold(0.8)
            .with_prune_after(1)
            .with_max_tool_result_length(100)
            .with_preserve_recent(2)
    }

    #[test]
    fn test_under_threshold_is_noop() {
        let messages = vec![Message::user("hi"), Message::assistant("hello")];
        let result = compact(&messages, "", &[], &small_config());
        assert!(!result.was_compacted);
        assert_eq!(result.recent_messages, messages);
        assert!(result.pruning_stats.is_none());
    }

    #[test]
    fn test_pruning_alone_is_enough() {
        // 10 + 640 + 4 * 50 = 850 tokens: 85% of the window
        let messages = vec![
            Message::user("u".repeat(40)),
            Message::tool_result("read_file", "c1", "x".repeat(2560)),
            Message::assistant("a".repeat(200)),
            Message::user("u".repeat(200)),
            Message::assistant("a".repeat(200)),
            Message::user("u".repeat(200)),
        ];
        let config = small_config();
        assert!(monitor(&messages, "", &[], &config).utilization >= 0.85);

        let stage = prepare_compaction(&messages, "", &[], &config);
        let CompactionStage::Pruned(result) = stage else {
            panic!("expected pruning to suffice");
        };
        let stats = result.pruning_stats.unwrap();
        assert!(stats.tool_results_cleared > 0);
        assert!(stats.chars_freed > 2000);
        assert!(result.was_compacted);
        assert!(!result.was_summarized());
        assert!(result.metrics.utilization < 0.8);
        assert!(result.recent_messages[1].content.starts_with(CLEARED_PREFIX));
        assert_eq!(result.recent_messages.len(), messages.len());
    }

    #[test]
    fn test_prune_ages() {
        let config = small_config().with_prune_after(2);
        let messages = vec![
            Message::tool_result("a", "1", "x".repeat(600)), // 4 users after: cleared
            Message::user("q1"),
            Message::user("q2"),
            Message::tool_result("b", "2", "y".repeat(600)), // 2 users after: truncated
            Message::user("q3"),
            Message::tool_result("c", "3", "z".repeat(600)), // 1 user after: kept
            Message::user("q4"),
            Message::tool_result("d", "4", "w".repeat(600)), // latest: kept
        ];
        let (pruned, stats) = prune_tool_results(&messages, &config);
        assert_eq!(stats.tool_results_cleared, 1);
        assert_eq!(stats.tool_results_truncated, 1);
        assert_eq!(pruned[0].content, "[Cleared: a result, 600 chars]");
        assert!(pruned[3].content.starts_with(&"y".repeat(100)));
        assert!(pruned[3].content.ends_with("[truncated 500 chars]"));
        assert_eq!(pruned[5].content.len(), 600);
        assert_eq!(pruned[7].content.len(), 600);
    }

    #[test]
    fn test_pruning_twice_changes_nothing_more() {
        let config = small_config();
        let messages = vec![
            Message::tool_result("a", "1", "x".repeat(600)),
            Message::user("q1"),
            Message::tool_result("b", "2", "y".repeat(600)),
            Message::user("q2"),
        ];
        let (once, _) = prune_tool_results(&messages, &config);
        let (twice, stats) = prune_tool_results(&once, &config);
        assert_eq!(once, twice);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_summarizes_when_pruning_is_not_enough() {
        let messages: Vec<Message> = (0..10)
            .flat_map(|i| {
                [
                    Message::user(format!("question {i} {}", "q".repeat(150))),
                    Message::assistant(format!("We decided on option {i} {}", "a".repeat(150))),
                ]
            })
            .collect();
        let config = small_config();

        let CompactionStage::NeedsSummary(request) =
            prepare_compaction(&messages, "", &[], &config)
        else {
            panic!("expected a summary request");
        };
        assert_eq!(request.recent.len(), 2);
        assert_eq!(request.older.len(), 18);
        assert!(request.transcript().starts_with("[user]: question 0"));

        let result = compact(&messages, "", &[], &config);
        assert!(result.was_compacted);
        assert!(result.was_summarized());
        assert!(result.summary.contains("We decided on option 8"));
        assert_eq!(result.recent_messages, messages[18..].to_vec());

        let compacted = result.into_messages();
        assert_eq!(compacted.len(), 3);
        assert_eq!(compacted[0].role, Role::System);
    }

    #[test]
    fn test_compacting_compacted_context_is_noop() {
        let messages: Vec<Message> = (0..60)
            .map(|i| Message::user(format!("message {i} {}", "m".repeat(60))))
            .collect();
        let config = small_config();
        let first = compact(&messages, "", &[], &config);
        assert!(first.was_summarized());
        assert!(first.metrics.utilization < config.compaction_threshold);
        let first = first.into_messages();

        let second = compact(&first, "", &[], &config);
        assert!(!second.was_compacted);
        assert_eq!(second.recent_messages, first);
    }

    #[test]
    fn test_empty_summary_keeps_history() {
        let messages: Vec<Message> = (0..6)
            .map(|i| Message::user(format!("{i} {}", "m".repeat(800))))
            .collect();
        let config = small_config();
        let CompactionStage::NeedsSummary(request) =
            prepare_compaction(&messages, "", &[], &config)
        else {
            panic!("expected a summary request");
        };
        let result = request.finish("  ", "", &[], &config);
        assert!(!result.was_summarized());
        assert_eq!(result.recent_messages, messages);
    }

    #[test]
    fn test_without_summary_keeps_pruned_history() {
        let messages: Vec<Message> = (0..6)
            .map(|i| Message::user(format!("{i} {}", "m".repeat(800))))
            .collect();
        let config = small_config();
        let CompactionStage::NeedsSummary(request) =
            prepare_compaction(&messages, "", &[], &config)
        else {
            panic!("expected a summary request");
        };
        let result = request.without_summary("", &[], &config);
        assert!(!result.was_compacted);
        assert_eq!(result.recent_messages, messages);
    }

    #[test]
    fn test_short_history_over_threshold_stops_after_pruning() {
        let messages = vec![Message::user("x".repeat(4000))];
        let stage = prepare_compaction(&messages, "", &[], &small_config());
        assert!(matches!(stage, CompactionStage::Pruned(ref r) if !r.was_compacted));
    }
}
