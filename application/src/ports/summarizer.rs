//! Summarizer port
//!
//! Condenses an older slice of the conversation into a short text block
//! during context compaction.

use super::llm_provider::{LlmProvider, ProviderError};
use async_trait::async_trait;
use conductor_domain::Message;
use conductor_domain::context::heuristic_summary;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while summarizing
#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Empty summary")]
    Empty,
}

/// Turns a rendered transcript into a summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError>;
}

/// Keyword-driven summarizer that never calls a model.
///
/// Keeps decision/finding/action lines and falls back to the tail of the
/// transcript.
pub struct HeuristicSummarizer {
    max_lines: usize,
}

impl HeuristicSummarizer {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines }
    }
}

impl Default for HeuristicSummarizer {
    fn default() -> Self {
        Self::new(20)
    }
}

#[async_trait]
impl Summarizer for HeuristicSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError> {
        let summary = heuristic_summary(transcript, self.max_lines);
        if summary.is_empty() {
            return Err(SummarizeError::Empty);
        }
        Ok(summary)
    }
}

const SUMMARY_SYSTEM_PROMPT: &str = "You compress conversation transcripts. \
Write a short bullet list of the decisions, findings, open questions and pending actions. \
Do not add anything that is not in the transcript.";

/// Summarizer that asks an [`LlmProvider`] for the summary.
pub struct LlmSummarizer {
    provider: Arc<dyn LlmProvider>,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError> {
        let messages = [
            Message::system(SUMMARY_SYSTEM_PROMPT),
            Message::user(transcript),
        ];
        let response = self.provider.chat(&messages, &[]).await?;
        let summary = response.content.trim();
        if summary.is_empty() {
            return Err(SummarizeError::Empty);
        }
        Ok(summary.to_string())
    }
}
