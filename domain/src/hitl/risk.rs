//! Tool-call risk assessment.
//!
//! Tool names are split into lowercase words (`github_mergePR` →
//! `github`, `merge`, `pr`) and matched against fixed keyword lists, so
//! `dropdown_list` is not mistaken for `drop`.

use super::entities::RiskLevel;
use serde_json::Value;

/// Tool-name words that always make a call high risk
const HIGH_RISK_TOOL_WORDS: &[&str] = &[
    "delete", "remove", "rm", "drop", "destroy", "deploy", "merge", "push", "force", "truncate",
    "reset", "clear", "wipe", "purge", "kill", "terminate", "shutdown", "revoke", "publish",
    "release", "transfer", "archive", "ban",
];

/// Substrings of serialized arguments that make a call high risk
const DESTRUCTIVE_ARG_PATTERNS: &[&str] = &[
    "--force",
    "--hard",
    "--no-verify",
    "rm -rf",
    "rm -r ",
    "drop table",
    "drop database",
    "truncate",
    "delete",
    "force push",
    "force-push",
    "purge",
];

const WRITE_TOOL_WORDS: &[&str] = &[
    "write", "update", "create", "edit", "modify", "set", "add", "insert", "post", "patch",
    "put", "send", "comment", "commit", "upload", "rename", "move", "assign", "label", "close",
    "open", "run", "execute", "exec",
];

const READ_TOOL_WORDS: &[&str] = &[
    "read", "get", "list", "search", "fetch", "view", "show", "find", "query", "describe",
    "status", "inspect", "lookup", "browse", "count", "diff", "log", "cat", "head", "grep",
];

/// Split a tool name into lowercase words on separators and camelCase.
fn tool_words(tool_name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in tool_name.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_numeric();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn has_word(words: &[String], table: &[&str]) -> bool {
    words.iter().any(|w| table.contains(&w.as_str()))
}

/// Assess how risky a tool call is.
///
/// In order: high-risk tool name → destructive arguments → write-like
/// name (medium) → read-like name (low) → medium.
pub fn determine_risk_level(tool_name: &str, args: &Value) -> RiskLevel {
    let words = tool_words(tool_name);

    if has_word(&words, HIGH_RISK_TOOL_WORDS) {
        return RiskLevel::High;
    }

    let args_text = match args {
        Value::Null => String::new(),
        other => other.to_string().to_lowercase(),
    };
    if DESTRUCTIVE_ARG_PATTERNS
        .iter()
        .any(|pattern| args_text.contains(pattern))
    {
        return RiskLevel::High;
    }

    if has_word(&words, WRITE_TOOL_WORDS) {
        return RiskLevel::Medium;
    }
    if has_word(&words, READ_TOOL_WORDS) {
        return RiskLevel::Low;
    }

    RiskLevel::Medium
}

/// Whether a call at or above `threshold` risk needs the user's approval.
pub fn requires_confirmation(tool_name: &str, args: &Value, threshold: RiskLevel) -> bool {
    determine_risk_level(tool_name, args) >= threshold
}
