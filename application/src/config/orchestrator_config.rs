//! Orchestrator configuration container.
//!
//! Use cases receive only the slice they need; the
//! [`MessageOrchestrator`](crate::use_cases::orchestrator::MessageOrchestrator)
//! holds the full container.

use conductor_domain::classification::ClassificationContext;
use conductor_domain::hitl::DEFAULT_CONFIRMATION_TTL_SECS;
use conductor_domain::{CompactionConfig, RiskLevel};
use serde::{Deserialize, Serialize};

/// Default system prompt for the simple responder and compaction metrics
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer concisely.";

/// Hybrid classifier parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Ask the LLM when no fast-path rule matches.
    pub llm_fallback: bool,
    /// History size (tokens) above which low complexity is bumped to medium.
    pub large_context_tokens: usize,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            llm_fallback: true,
            large_context_tokens: ClassificationContext::DEFAULT_LARGE_CONTEXT_TOKENS,
        }
    }
}

/// Plan execution parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Maximum steps dispatched at once within a dependency level.
    pub max_parallelism: usize,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self { max_parallelism: 4 }
    }
}

/// Confirmation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitlParams {
    /// Seconds before a pending confirmation expires.
    pub confirmation_ttl_secs: i64,
    /// Tool calls at or above this risk need a confirmation.
    pub confirmation_threshold: RiskLevel,
}

impl Default for HitlParams {
    fn default() -> Self {
        Self {
            confirmation_ttl_secs: DEFAULT_CONFIRMATION_TTL_SECS,
            confirmation_threshold: RiskLevel::Medium,
        }
    }
}

impl HitlParams {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.confirmation_ttl_secs)
    }
}

/// Full configuration for the message orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub classifier: ClassifierParams,
    pub execution: ExecutionParams,
    pub hitl: HitlParams,
    pub compaction: CompactionConfig,
    pub system_prompt: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierParams::default(),
            execution: ExecutionParams::default(),
            hitl: HitlParams::default(),
            compaction: CompactionConfig::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl OrchestratorConfig {
    // ==================== Builder Methods ====================

    pub fn with_llm_fallback(mut self, enabled: bool) -> Self {
        self.classifier.llm_fallback = enabled;
        self
    }

    pub fn with_large_context_tokens(mut self, tokens: usize) -> Self {
        self.classifier.large_context_tokens = tokens;
        self
    }

    pub fn with_max_parallelism(mut self, max: usize) -> Self {
        self.execution.max_parallelism = max;
        self
    }

    pub fn with_confirmation_ttl_secs(mut self, secs: i64) -> Self {
        self.hitl.confirmation_ttl_secs = secs;
        self
    }

    pub fn with_confirmation_threshold(mut self, threshold: RiskLevel) -> Self {
        self.hitl.confirmation_threshold = threshold;
        self
    }

    pub fn with_compaction(mut self, compaction: CompactionConfig) -> Self {
        self.compaction = compaction;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert!(config.classifier.llm_fallback);
        assert_eq!(config.classifier.large_context_tokens, 32_000);
        assert_eq!(config.execution.max_parallelism, 4);
        assert_eq!(config.hitl.confirmation_ttl_secs, 300);
        assert_eq!(config.hitl.confirmation_threshold, RiskLevel::Medium);
        assert_eq!(config.hitl.ttl(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_builder_chain() {
        let config = OrchestratorConfig::default()
            .with_llm_fallback(false)
            .with_max_parallelism(1)
            .with_confirmation_threshold(RiskLevel::High)
            .with_system_prompt("be brief");
        assert!(!config.classifier.llm_fallback);
        assert_eq!(config.execution.max_parallelism, 1);
        assert_eq!(config.hitl.confirmation_threshold, RiskLevel::High);
        assert_eq!(config.system_prompt, "be brief");
    }
}
