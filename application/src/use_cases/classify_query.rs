//! Hybrid query classification.
//!
//! The fast path is the domain's keyword table; when nothing matches, the
//! LLM is asked for a structured classification. Any LLM failure falls back
//! to the default classification, so this use case never errors.
//!
//! The LLM tier obeys the same rule as the fast path: a message is only a
//! confirmation reply while a confirmation is pending.

use crate::ports::llm_provider::{LlmProvider, ProviderError};
use conductor_domain::classification::{
    ClassificationContext, Complexity, QueryCategory, QueryClassification, QueryType,
    classification_instructions, parse_classification_response, quick_classify,
};
use conductor_domain::Message;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Why the LLM tier could not produce a classification
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("No LLM provider configured")]
    NoProvider,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Malformed classification response: {0}")]
    MalformedResponse(String),
}

/// Which tier produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationTier {
    FastPath,
    Llm,
    Fallback,
}

impl ClassificationTier {
    pub fn as_str(&self) -> &str {
        match self {
            ClassificationTier::FastPath => "fast_path",
            ClassificationTier::Llm => "llm",
            ClassificationTier::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ClassificationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationOutcome {
    pub classification: QueryClassification,
    pub tier: ClassificationTier,
}

/// Use case for classifying an incoming message
pub struct ClassifyQueryUseCase {
    provider: Option<Arc<dyn LlmProvider>>,
    llm_fallback: bool,
}

impl ClassifyQueryUseCase {
    /// Classifier with the fast path only.
    pub fn new() -> Self {
        Self {
            provider: None,
            llm_fallback: false,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self.llm_fallback = true;
        self
    }

    pub fn with_llm_fallback(mut self, enabled: bool) -> Self {
        self.llm_fallback = enabled;
        self
    }

    /// Classify `text`, trying the fast path first.
    pub async fn classify(
        &self,
        text: &str,
        context: Option<&ClassificationContext>,
    ) -> ClassificationOutcome {
        if let Some(classification) = quick_classify(text, context) {
            debug!(
                "Fast-path classification: {}/{}/{}",
                classification.query_type, classification.category, classification.complexity
            );
            return ClassificationOutcome {
                classification,
                tier: ClassificationTier::FastPath,
            };
        }

        if !self.llm_fallback {
            return Self::fallback_outcome();
        }

        match self.classify_with_llm(text).await {
            Ok(mut classification) => {
                if context.is_some_and(ClassificationContext::is_large)
                    && classification.complexity == Complexity::Low
                {
                    classification.complexity = Complexity::Medium;
                }
                if classification.query_type == QueryType::ToolConfirmation
                    && context.is_some_and(|c| c.pending_confirmations == 0)
                {
                    debug!("LLM reported a confirmation reply with nothing pending");
                    classification.query_type = request_type(&classification);
                }
                debug!(
                    "LLM classification: {}/{}/{}",
                    classification.query_type, classification.category, classification.complexity
                );
                ClassificationOutcome {
                    classification,
                    tier: ClassificationTier::Llm,
                }
            }
            Err(e) => {
                warn!("LLM classification failed, using fallback: {}", e);
                Self::fallback_outcome()
            }
        }
    }

    /// Ask the LLM for a structured classification.
    pub async fn classify_with_llm(
        &self,
        text: &str,
    ) -> Result<QueryClassification, ClassificationError> {
        let provider = self.provider.as_ref().ok_or(ClassificationError::NoProvider)?;
        let messages = [
            Message::system(classification_instructions()),
            Message::user(text),
        ];
        let response = provider.chat(&messages, &[]).await?;
        parse_classification_response(&response.content)
            .ok_or_else(|| ClassificationError::MalformedResponse(response.content.clone()))
    }

    fn fallback_outcome() -> ClassificationOutcome {
        ClassificationOutcome {
            classification: QueryClassification::fallback(),
            tier: ClassificationTier::Fallback,
        }
    }
}

/// Request type for a message that is not a confirmation reply.
fn request_type(classification: &QueryClassification) -> QueryType {
    if classification.category == QueryCategory::General
        && classification.complexity == Complexity::Low
    {
        QueryType::Simple
    } else {
        QueryType::Complex
    }
}

impl Default for ClassifyQueryUseCase {
    fn default() -> Self {
        Self::new()
    }
}
