//! Shared utility functions.

/// Truncate a string to approximately `max_bytes` without splitting a UTF-8
/// character boundary.
///
/// Returns a sub-slice of the original string. If the string is shorter than
/// `max_bytes`, the entire string is returned unchanged.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate to `max_bytes` and append a marker recording how much was cut.
///
/// Strings that already fit are returned unchanged.
pub fn truncate_with_marker(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let head = truncate_str(s, max_bytes);
    format!("{}\n[truncated {} chars]", head, s.len() - head.len())
}

/// Collapse whitespace runs and lowercase, for keyword comparisons.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn truncate_no_op_when_short() {
        assert_eq!(truncate_str("hi", 10), "hi");
    }

    #[test]
    fn truncate_multibyte_boundary() {
        // 'é' is 2 bytes
        let s = "éé";
        assert_eq!(truncate_str(s, 3), "é");
        assert_eq!(truncate_str(s, 4), "éé");
    }

    #[test]
    fn truncate_with_marker_reports_cut() {
        let out = truncate_with_marker(&"x".repeat(50), 10);
        assert!(out.starts_with("xxxxxxxxxx\n"));
        assert!(out.ends_with("[truncated 40 chars]"));
    }

    #[test]
    fn truncate_with_marker_keeps_short() {
        assert_eq!(truncate_with_marker("short", 10), "short");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  Approve   ALL \n"), "approve all");
    }
}
