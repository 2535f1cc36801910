// Pairwise paragraph similarity ("percentage match").
//
// Each paragraph is normalized by sorting its whitespace-separated tokens, so
// reordered wording still matches, and then compared character by character
// with Ratcliff/Obershelp block matching. Scores are percentages rounded to
// two decimals.
//
// Cost is quadratic in the number of paragraphs and roughly quadratic in
// paragraph length per pair. This, not I/O, bounds practical corpus size.

pub mod cross;
pub mod matcher;
pub mod matrix;

pub use cross::ScoreTable;
pub use matcher::PreparedText;
pub use matrix::{similarity_matrix, SimilarityMatrix};

/// Sort a paragraph's tokens lexicographically and re-join them with spaces.
pub fn normalize(paragraph: &str) -> String {
    let mut tokens: Vec<&str> = paragraph.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity of two paragraphs as a percentage in `[0, 100]`, 2 decimals.
///
/// Symmetric: `similarity(a, b) == similarity(b, a)` for all inputs.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = PreparedText::new(&normalize(a));
    let b = PreparedText::new(&normalize(b));
    score(&a, &b)
}

/// Score two already-normalized, prepared paragraphs.
pub(crate) fn score(a: &PreparedText, b: &PreparedText) -> f64 {
    // Block matching breaks ties by position, so fix the operand order
    let (first, second) = if a.text() <= b.text() { (a, b) } else { (b, a) };
    round_percent(matcher::ratio(first, second))
}

/// Convert a 0..=1 ratio to a percentage rounded to two decimals.
///
/// Exact ties round half to even, so 3.125 becomes 3.12 and 9.375 becomes
/// 9.38.
pub fn round_percent(ratio: f64) -> f64 {
    (ratio * 100.0 * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sorts_tokens() {
        assert_eq!(normalize("  gamma alpha\n beta "), "alpha beta gamma");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_word_order_insensitive() {
        assert_eq!(similarity("alpha beta gamma", "gamma alpha beta"), 100.0);
    }

    #[test]
    fn test_punctuation_sensitive() {
        let s = similarity("alpha beta", "alpha beta.");
        assert!(s < 100.0);
        // 2 * 10 / (10 + 11)
        assert_eq!(s, 95.24);
    }

    #[test]
    fn test_disjoint_scores_zero() {
        assert_eq!(similarity("aaa", "zzz"), 0.0);
    }

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(2.0 / 3.0), 66.67);
        assert_eq!(round_percent(1.0), 100.0);
    }

    #[test]
    fn test_round_percent_ties_go_to_even() {
        // 1 matched char in 64 total: 2 * 1 / 64 = 3.125%
        assert_eq!(round_percent(2.0 / 64.0), 3.12);
        assert_eq!(round_percent(3.0 / 32.0), 9.38);
        assert_eq!(round_percent(0.5), 50.0);
    }
}
