//! Fast-path classification from literal keyword/regex tables.
//!
//! [`quick_classify`] walks the tables in priority order
//! (greeting > admin command > confirmation token > domain keyword) and
//! returns `None` when nothing matches. `None` is the "don't know" signal
//! that lets a caller escalate to an LLM.

use super::entities::{
    ClassificationContext, Complexity, QueryCategory, QueryClassification, QueryType,
};
use crate::hitl::response::is_confirmation_reply;
use regex::Regex;
use std::sync::LazyLock;

/// Messages at or below this many words are considered low complexity.
const LOW_COMPLEXITY_MAX_WORDS: usize = 6;
/// Messages above this many words are considered high complexity.
const HIGH_COMPLEXITY_MIN_WORDS: usize = 60;

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(hi|hello|hey|hiya|yo|howdy|greetings|good (morning|afternoon|evening)|thanks|thank you|thx)( there| all| everyone| bot)?\s*[!.,?\s]*(👋|🙂|😊)?\s*$",
    )
    .unwrap()
});

/// Admin commands that only read state
static ADMIN_READ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*/(help|status|start|about|settings)\b").unwrap());

/// Admin commands that destroy session state and always need approval
static ADMIN_DESTRUCTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(/(clear|reset|forget|wipe)\b|(reset|clear)( (the )?(history|conversation|context|memory|session))?\s*[!.]?\s*$)")
        .unwrap()
});

/// Ordered domain tables; first match wins.
static DOMAIN_TABLE: LazyLock<Vec<(QueryCategory, Regex)>> = LazyLock::new(|| {
    vec![
        (
            QueryCategory::Github,
            Regex::new(r"(?i)\b(github|pull request|pr\s*#?\d+|issue\s*#\d+|repo(sitory)?|fork|commit|branch|merge request|gist|release notes|workflow run|actions?\s+run)\b")
                .unwrap(),
        ),
        (
            QueryCategory::Code,
            Regex::new(r"(?i)(```|\b(code|function|method|class|bug|compile|compiler|refactor|implement|debug|stack ?trace|exception|segfault|regex|unit tests?|api|endpoint|rust|python|typescript|javascript|golang|sql|script|snippet|syntax)\b)")
                .unwrap(),
        ),
        (
            QueryCategory::Research,
            Regex::new(r"(?i)\b(research|investigate|compare|comparison|sources?|citations?|papers?|study|studies|literature|survey|analy[sz]e|analysis|pros and cons|latest news|market|trends?|what is known about)\b")
                .unwrap(),
        ),
    ]
});

/// Phrases signalling several dependent steps
static MULTI_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(and then|after that|afterwards|step[- ]by[- ]step|end[- ]to[- ]end|multi[- ]step|in multiple steps|for each|finally)\b")
        .unwrap()
});

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s+\S").unwrap());

/// Classify from the literal tables, or `None` when no pattern matches.
///
/// `context` is optional: without it, confirmation tokens are always
/// recognized; with it, only while confirmations are pending.
pub fn quick_classify(
    text: &str,
    context: Option<&ClassificationContext>,
) -> Option<QueryClassification> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if GREETING.is_match(trimmed) {
        return Some(
            QueryClassification::new(QueryType::Simple, QueryCategory::General, Complexity::Low)
                .with_reasoning("greeting"),
        );
    }

    if ADMIN_DESTRUCTIVE.is_match(trimmed) {
        return Some(
            QueryClassification::new(QueryType::Simple, QueryCategory::Admin, Complexity::Low)
                .with_approval(true)
                .with_reasoning("destructive admin command"),
        );
    }

    if ADMIN_READ.is_match(trimmed) {
        return Some(
            QueryClassification::new(QueryType::Simple, QueryCategory::Admin, Complexity::Low)
                .with_reasoning("admin command"),
        );
    }

    let awaiting = context.is_none_or(|ctx| ctx.pending_confirmations > 0);
    if awaiting && is_confirmation_reply(trimmed) {
        return Some(
            QueryClassification::new(
                QueryType::ToolConfirmation,
                QueryCategory::General,
                Complexity::Low,
            )
            .with_reasoning("confirmation reply"),
        );
    }

    let (category, pattern) = DOMAIN_TABLE
        .iter()
        .find(|(_, pattern)| pattern.is_match(trimmed))?;

    let mut complexity = estimate_complexity(trimmed);
    if complexity == Complexity::Low && context.is_some_and(|ctx| ctx.is_large()) {
        complexity = Complexity::Medium;
    }
    let query_type = if complexity == Complexity::Low {
        QueryType::Simple
    } else {
        QueryType::Complex
    };

    let keyword = pattern
        .find(trimmed)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();

    Some(
        QueryClassification::new(query_type, *category, complexity)
            .with_reasoning(format!("{} keyword '{}'", category, keyword)),
    )
}

/// Word-count and structure heuristic used by the fast path.
pub fn estimate_complexity(text: &str) -> Complexity {
    let words = text.split_whitespace().count();
    let numbered_lines = NUMBERED_LINE.find_iter(text).count();

    if words > HIGH_COMPLEXITY_MIN_WORDS || numbered_lines >= 2 || MULTI_STEP.is_match(text) {
        Complexity::High
    } else if words <= LOW_COMPLEXITY_MAX_WORDS {
        Complexity::Low
    } else {
        Complexity::Medium
    }
}
