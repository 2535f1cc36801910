// Sentence-punctuation segmentation (legacy policy).
//
// Each page is split where a `.`, `!` or `?` is followed by horizontal
// whitespace (any Unicode space other than a newline, so a no-break space
// counts) and then a line break. The terminator and the break are
// consumed. A terminator directly followed by a newline does not split, which
// matches how older reports were produced. Pieces are not trimmed and short
// pieces are not merged.

use std::sync::LazyLock;

use regex::Regex;

use super::char_len;

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.!?][^\S\n]\s*\n\s*").expect("sentence break pattern is valid")
});

/// Segment pages into sentence-delimited paragraphs.
pub fn segment<S: AsRef<str>>(pages: &[S], min_chars: usize) -> Vec<String> {
    let mut paragraphs = Vec::new();

    for page in pages {
        let standardized = page.as_ref().replace("\r\n", "\n").replace('\r', "\n");
        for piece in SENTENCE_BREAK.split(&standardized) {
            if piece.trim().is_empty() || char_len(piece) < min_chars {
                continue;
            }
            paragraphs.push(piece.to_string());
        }
    }

    paragraphs
}
