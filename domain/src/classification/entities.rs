//! Classification entities

use serde::{Deserialize, Serialize};

/// What kind of turn the inbound message is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Simple,
    Complex,
    /// A reply to a pending tool confirmation (approve/reject)
    ToolConfirmation,
}

impl QueryType {
    pub fn as_str(&self) -> &str {
        match self {
            QueryType::Simple => "simple",
            QueryType::Complex => "complex",
            QueryType::ToolConfirmation => "tool_confirmation",
        }
    }

    pub fn all() -> [QueryType; 3] {
        [
            QueryType::Simple,
            QueryType::Complex,
            QueryType::ToolConfirmation,
        ]
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task domain the message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    General,
    Admin,
    Code,
    Research,
    Github,
}

impl QueryCategory {
    pub fn as_str(&self) -> &str {
        match self {
            QueryCategory::General => "general",
            QueryCategory::Admin => "admin",
            QueryCategory::Code => "code",
            QueryCategory::Research => "research",
            QueryCategory::Github => "github",
        }
    }

    pub fn all() -> [QueryCategory; 5] {
        [
            QueryCategory::General,
            QueryCategory::Admin,
            QueryCategory::Code,
            QueryCategory::Research,
            QueryCategory::Github,
        ]
    }

    /// Categories that are handled by specialized workers
    pub fn is_worker_domain(&self) -> bool {
        matches!(
            self,
            QueryCategory::Code | QueryCategory::Research | QueryCategory::Github
        )
    }
}

impl std::fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QueryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(QueryCategory::General),
            "admin" => Ok(QueryCategory::Admin),
            "code" => Ok(QueryCategory::Code),
            "research" => Ok(QueryCategory::Research),
            "github" => Ok(QueryCategory::Github),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Estimated effort; ordered so thresholds can be compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }

    pub fn all() -> [Complexity; 3] {
        [Complexity::Low, Complexity::Medium, Complexity::High]
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying one inbound message.
///
/// Produced once per message and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClassification {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub category: QueryCategory,
    pub complexity: Complexity,
    #[serde(alias = "requiresHumanApproval", default)]
    pub requires_human_approval: bool,
    #[serde(default)]
    pub reasoning: String,
}

impl QueryClassification {
    pub fn new(query_type: QueryType, category: QueryCategory, complexity: Complexity) -> Self {
        Self {
            query_type,
            category,
            complexity,
            requires_human_approval: false,
            reasoning: String::new(),
        }
    }

    pub fn with_approval(mut self, required: bool) -> Self {
        self.requires_human_approval = required;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// The classification used whenever nothing better is available.
    pub fn fallback() -> Self {
        Self::new(
            QueryType::Complex,
            QueryCategory::General,
            Complexity::Medium,
        )
        .with_reasoning("fallback: classification unavailable")
    }
}

/// Conversation facts that influence classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationContext {
    /// Confirmations still awaiting a user decision
    pub pending_confirmations: usize,
    /// Estimated tokens of the conversation so far
    pub history_tokens: usize,
    /// Above this many history tokens, low complexity is treated as medium
    pub large_context_tokens: usize,
}

impl ClassificationContext {
    pub const DEFAULT_LARGE_CONTEXT_TOKENS: usize = 32_000;

    pub fn new(pending_confirmations: usize, history_tokens: usize) -> Self {
        Self {
            pending_confirmations,
            history_tokens,
            large_context_tokens: Self::DEFAULT_LARGE_CONTEXT_TOKENS,
        }
    }

    pub fn with_large_context_tokens(mut self, tokens: usize) -> Self {
        self.large_context_tokens = tokens;
        self
    }

    pub fn is_large(&self) -> bool {
        self.history_tokens > self.large_context_tokens
    }
}

impl Default for ClassificationContext {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
