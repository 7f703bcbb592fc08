//! Context compaction.
//!
//! Runs the domain's staged compaction and fills in the summary through the
//! [`Summarizer`] port. Compaction always succeeds locally: a failing
//! summarizer leaves the pruned history in place, and a failing persistence
//! adapter is only logged.

use crate::ports::context_persistence::ContextPersistence;
use crate::ports::summarizer::{HeuristicSummarizer, Summarizer};
use conductor_domain::context::{CompactionStage, prepare_compaction};
use conductor_domain::{CompactedContext, CompactionConfig, Message};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Input for one compaction pass
#[derive(Debug, Clone, Copy)]
pub struct CompactContextInput<'a> {
    pub session_id: &'a str,
    pub messages: &'a [Message],
    pub system_prompt: &'a str,
    pub tools: &'a [Value],
}

impl<'a> CompactContextInput<'a> {
    pub fn new(session_id: &'a str, messages: &'a [Message]) -> Self {
        Self {
            session_id,
            messages,
            system_prompt: "",
            tools: &[],
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: &'a str) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn with_tools(mut self, tools: &'a [Value]) -> Self {
        self.tools = tools;
        self
    }
}

/// Use case for keeping a conversation under its token budget
pub struct CompactContextUseCase {
    config: CompactionConfig,
    summarizer: Arc<dyn Summarizer>,
    persistence: Option<Arc<dyn ContextPersistence>>,
}

impl CompactContextUseCase {
    /// Compactor with the heuristic summarizer and no persistence.
    pub fn new(config: CompactionConfig) -> Self {
        let summarizer = Arc::new(HeuristicSummarizer::new(config.summary_max_lines));
        Self {
            config,
            summarizer,
            persistence: None,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn ContextPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    pub async fn execute(&self, input: CompactContextInput<'_>) -> CompactedContext {
        let stage = prepare_compaction(
            input.messages,
            input.system_prompt,
            input.tools,
            &self.config,
        );

        let result = match stage {
            CompactionStage::UnderThreshold(result) => {
                debug!(
                    "Context at {:.0}% of budget; no compaction",
                    result.metrics.utilization * 100.0
                );
                return result;
            }
            CompactionStage::Pruned(result) => {
                info!(
                    "Context pruned to {:.0}% of budget",
                    result.metrics.utilization * 100.0
                );
                result
            }
            CompactionStage::NeedsSummary(request) => {
                match self.summarizer.summarize(&request.transcript()).await {
                    Ok(summary) => {
                        let result = request.finish(
                            summary,
                            input.system_prompt,
                            input.tools,
                            &self.config,
                        );
                        info!(
                            "Context summarized to {} message(s), {:.0}% of budget",
                            result.recent_messages.len() + 1,
                            result.metrics.utilization * 100.0
                        );
                        result
                    }
                    Err(e) => {
                        warn!("Summarizer failed, keeping pruned history: {}", e);
                        request.without_summary(input.system_prompt, input.tools, &self.config)
                    }
                }
            }
        };

        if result.was_summarized()
            && let Some(persistence) = &self.persistence
            && let Err(e) = persistence
                .save(input.session_id, &result.summary, &result.metrics)
                .await
        {
            warn!(
                "Failed to persist compaction summary for session {}: {}",
                input.session_id, e
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FixedSummarizer, RecordingPersistence};
    use conductor_domain::context::SUMMARY_PREFIX;

    /// 1000-token window at 4 chars/token
    fn small_config() -> CompactionConfig {
        CompactionConfig::default()
            .with_max_tokens(1000)
            .with_threshold(0.8)
            .with_prune_after(1)
            .with_preserve_recent(4)
    }

    /// Long user/assistant history with no tool results to prune.
    fn long_chat() -> Vec<Message> {
        (0..40)
            .map(|i| {
                let text = format!("turn {i}: {}", "words ".repeat(20));
                if i % 2 == 0 {
                    Message::user(text)
                } else {
                    Message::assistant(text)
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_under_threshold_is_untouched() {
        let messages = vec![Message::user("hi"), Message::assistant("hello")];
        let use_case = CompactContextUseCase::new(small_config());

        let result = use_case
            .execute(CompactContextInput::new("s1", &messages))
            .await;

        assert!(!result.was_compacted);
        assert_eq!(result.recent_messages, messages);
    }

    #[tokio::test]
    async fn test_summary_replaces_older_turns_and_is_persisted() {
        let messages = long_chat();
        let persistence = Arc::new(RecordingPersistence::default());
        let use_case = CompactContextUseCase::new(small_config())
            .with_summarizer(Arc::new(FixedSummarizer(Some("- agreed on the plan".into()))))
            .with_persistence(persistence.clone());

        let result = use_case
            .execute(CompactContextInput::new("s1", &messages))
            .await;

        assert!(result.was_compacted);
        assert_eq!(result.summary, "- agreed on the plan");
        assert_eq!(result.recent_messages.len(), 4);
        let rebuilt = result.into_messages();
        assert!(rebuilt[0].content.starts_with(SUMMARY_PREFIX));

        let saved = persistence.saved.lock().unwrap();
        assert_eq!(saved.as_slice(), &[("s1".to_string(), "- agreed on the plan".to_string())]);
    }

    #[tokio::test]
    async fn test_summarizer_failure_keeps_history() {
        let messages = long_chat();
        let persistence = Arc::new(RecordingPersistence::default());
        let use_case = CompactContextUseCase::new(small_config())
            .with_summarizer(Arc::new(FixedSummarizer(None)))
            .with_persistence(persistence.clone());

        let result = use_case
            .execute(CompactContextInput::new("s1", &messages))
            .await;

        assert!(!result.was_summarized());
        assert_eq!(result.recent_messages, messages);
        assert!(persistence.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_swallowed() {
        let messages = long_chat();
        let use_case = CompactContextUseCase::new(small_config())
            .with_summarizer(Arc::new(FixedSummarizer(Some("- done".into()))))
            .with_persistence(Arc::new(RecordingPersistence::failing()));

        let result = use_case
            .execute(CompactContextInput::new("s1", &messages))
            .await;

        assert!(result.was_compacted);
        assert_eq!(result.summary, "- done");
    }

    #[tokio::test]
    async fn test_default_heuristic_summarizer() {
        let messages = long_chat();
        let mut config = small_config();
        config.summary_max_lines = 5;
        let result = CompactContextUseCase::new(config)
            .execute(CompactContextInput::new("s1", &messages))
            .await;

        assert!(result.was_summarized());
        assert!(result.metrics.utilization < 0.8);
    }

    #[tokio::test]
    async fn test_compacted_context_is_stable() {
        let messages = long_chat();
        let use_case = CompactContextUseCase::new(small_config())
            .with_summarizer(Arc::new(FixedSummarizer(Some("- short".into()))));

        let first = use_case
            .execute(CompactContextInput::new("s1", &messages))
            .await
            .into_messages();
        let second = use_case
            .execute(CompactContextInput::new("s1", &first))
            .await;

        assert!(!second.was_compacted);
        assert_eq!(second.recent_messages, first);
    }
}
