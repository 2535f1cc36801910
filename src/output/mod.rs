// Output formatting: terminal display and text cleanup for reports.

pub mod terminal;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Unlike byte slicing (`&text[..120]`), this respects UTF-8 character boundaries
/// and will never panic on multi-byte characters like accented letters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Strip C0 and C1 control characters (U+0000–U+001F, U+007F–U+009F).
///
/// PDF text layers carry stray form feeds, soft hyphens encoded as control
/// codes and the like, which garble terminals and spreadsheet renderers.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| !matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}'..='\u{9f}'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_chars("déjà vu", 4), "déjà...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_sanitize_removes_controls() {
        assert_eq!(sanitize("a\u{0}b\tc\u{85}d\u{7f}"), "abcd");
        assert_eq!(sanitize("plain text"), "plain text");
    }
}
