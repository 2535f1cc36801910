// Paragraph segmentation: raw page text in, ordered paragraph strings out.
//
// Two heuristics exist in the wild and they disagree, so each is a named
// policy rather than a blend of both:
//
//   BlankLine:   paragraphs end at blank lines; short paragraphs (< 20
//                 words) are merged into a block ahead of the next long one.
//   Punctuation: paragraphs end where a sentence terminator is followed by
//                 a line break. Kept for parity with older reports.

pub mod blank_line;
pub mod punctuation;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Paragraphs with fewer words than this are merged with their neighbours.
pub const SHORT_PARAGRAPH_WORDS: usize = 20;

/// Which segmentation heuristic to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentationPolicy {
    #[default]
    BlankLine,
    Punctuation,
}

impl SegmentationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentationPolicy::BlankLine => "blank-line",
            SegmentationPolicy::Punctuation => "punctuation",
        }
    }
}

impl fmt::Display for SegmentationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentationPolicy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blank-line" | "blankline" | "blank_line" => Ok(SegmentationPolicy::BlankLine),
            "punctuation" => Ok(SegmentationPolicy::Punctuation),
            _ => Err(ConfigurationError::InvalidValue {
                name: "policy",
                value: s.to_string(),
                reason: "expected `blank-line` or `punctuation`",
            }),
        }
    }
}

/// Everything that changes segmentation output. Part of the cache key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Paragraphs shorter than this many characters are dropped (0 = keep all).
    pub min_chars: usize,
    pub policy: SegmentationPolicy,
}

/// A paragraph together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub text: String,
    pub source_document_id: usize,
    /// Position within the source document, starting at 0.
    pub ordinal: usize,
}

impl Paragraph {
    /// Attach provenance to a document's segmented paragraph texts.
    pub fn from_texts(source_document_id: usize, texts: &[String]) -> Vec<Paragraph> {
        texts
            .iter()
            .enumerate()
            .map(|(ordinal, text)| Paragraph {
                text: text.clone(),
                source_document_id,
                ordinal,
            })
            .collect()
    }
}

/// Segment a document's pages into paragraphs using the configured policy.
///
/// Pure and deterministic: the same pages and config always produce the same
/// ordered output. An empty document yields an empty list.
pub fn segment<S: AsRef<str>>(pages: &[S], config: &SegmentConfig) -> Vec<String> {
    match config.policy {
        SegmentationPolicy::BlankLine => blank_line::segment(pages, config.min_chars),
        SegmentationPolicy::Punctuation => punctuation::segment(pages, config.min_chars),
    }
}

/// Character count (not bytes), the unit of the `min_chars` floor.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "Blank-Line".parse::<SegmentationPolicy>().unwrap(),
            SegmentationPolicy::BlankLine
        );
        assert_eq!(
            "punctuation".parse::<SegmentationPolicy>().unwrap(),
            SegmentationPolicy::Punctuation
        );
        assert!("sentences".parse::<SegmentationPolicy>().is_err());
    }

    #[test]
    fn test_paragraph_provenance() {
        let texts = vec!["first".to_string(), "second".to_string()];
        let paragraphs = Paragraph::from_texts(3, &texts);
        assert_eq!(paragraphs[1].source_document_id, 3);
        assert_eq!(paragraphs[1].ordinal, 1);
        assert_eq!(paragraphs[1].text, "second");
    }

    #[test]
    fn test_dispatch_by_policy() {
        let pages = ["One sentence. \nTwo sentence.\n"];
        let blank = segment(&pages, &SegmentConfig::default());
        let punct = segment(
            &pages,
            &SegmentConfig {
                min_chars: 0,
                policy: SegmentationPolicy::Punctuation,
            },
        );
        assert_eq!(blank, vec!["One sentence. Two sentence."]);
        assert_eq!(punct.len(), 2);
    }
}
