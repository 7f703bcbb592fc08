//! Transcript formatting and the heuristic summarizer.

use crate::session::entities::{Message, Role};
use crate::util::truncate_str;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix of the system message that carries a compaction summary.
pub const SUMMARY_PREFIX: &str = "Summary of earlier conversation:";

/// Longest line the heuristic summarizer keeps
const MAX_SUMMARY_LINE_CHARS: usize = 200;

/// Lines worth keeping: decisions, findings, actions
static SALIENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(decided|decision|agreed|conclusion|concluded|found|finding|discovered|result|learned|action|todo|next step|will|must|should|created|fixed|deployed|merged|approved|rejected|error|failed)\b")
        .unwrap()
});

/// Render messages as `[role]: content` lines for a summarizer.
///
/// Tool results are labelled with their tool name.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| match (&m.role, &m.tool_name) {
            (Role::Tool, Some(tool)) => format!("[tool:{}]: {}", tool, m.content),
            (role, _) => format!("[{}]: {}", role, m.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keyword-extraction summary used when no LLM summarizer is available.
///
/// Keeps lines matching decision/finding/action patterns, up to
/// `max_lines`; with no such lines, falls back to the last `max_lines`
/// non-empty lines. Long lines are cut short.
pub fn heuristic_summary(transcript: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = transcript
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut salient: Vec<&str> = Vec::new();
    for &line in &lines {
        if SALIENT_LINE.is_match(line) && !salient.contains(&line) {
            salient.push(line);
        }
    }

    let kept: Vec<&str> = if salient.is_empty() {
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].to_vec()
    } else {
        let start = salient.len().saturating_sub(max_lines);
        salient[start..].to_vec()
    };

    kept.iter()
        .map(|l| format!("- {}", truncate_str(l, MAX_SUMMARY_LINE_CHARS)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The system message that replaces summarized history.
pub fn summary_message(summary: &str) -> Message {
    Message::system(format!("{}\n{}", SUMMARY_PREFIX, summary))
}
