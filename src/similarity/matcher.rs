// Ratcliff/Obershelp block matching.
//
// Find the longest common contiguous block of the two sequences, then recurse
// into the unmatched stretches on its left and right. The similarity ratio is
// 2 * matched / (len(a) + len(b)). Sequences are Unicode scalar values, not
// bytes, so accented text isn't penalized for its encoding width.

use std::collections::HashMap;

/// A normalized paragraph with a position index for fast block matching.
///
/// Preparing once per paragraph and reusing it across all pairs avoids
/// rebuilding the index n times for an n × n matrix.
#[derive(Debug, Clone)]
pub struct PreparedText {
    text: String,
    chars: Vec<char>,
    /// Ascending positions of every char in `chars`.
    positions: HashMap<char, Vec<usize>>,
}

impl PreparedText {
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (i, c) in chars.iter().enumerate() {
            positions.entry(*c).or_default().push(i);
        }
        Self {
            text: text.to_string(),
            chars,
            positions,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// A matched block: `a[a_start..a_start + len] == b[b_start..b_start + len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub a_start: usize,
    pub b_start: usize,
    pub len: usize,
}

/// Similarity ratio in `[0, 1]`. Two empty sequences are identical (1.0).
pub fn ratio(a: &PreparedText, b: &PreparedText) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched: usize = matching_blocks(a, b).iter().map(|block| block.len).sum();
    2.0 * matched as f64 / total as f64
}

/// All matched blocks, ordered by position in `a`.
pub fn matching_blocks(a: &PreparedText, b: &PreparedText) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let block = longest_match(a, b, a_lo, a_hi, b_lo, b_hi);
        if block.len == 0 {
            continue;
        }
        if a_lo < block.a_start && b_lo < block.b_start {
            pending.push((a_lo, block.a_start, b_lo, block.b_start));
        }
        let (a_end, b_end) = (block.a_start + block.len, block.b_start + block.len);
        if a_end < a_hi && b_end < b_hi {
            pending.push((a_end, a_hi, b_end, b_hi));
        }
        blocks.push(block);
    }

    blocks.sort_by_key(|block| (block.a_start, block.b_start));
    blocks
}

/// Longest common block of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`.
///
/// Ties resolve to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &PreparedText,
    b: &PreparedText,
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> Block {
    let mut best = Block {
        a_start: a_lo,
        b_start: b_lo,
        len: 0,
    };

    // run_len[j] = length of the match ending at a[i - 1], b[j]
    let mut run_len: HashMap<usize, usize> = HashMap::new();
    let mut next_run_len: HashMap<usize, usize> = HashMap::new();

    for i in a_lo..a_hi {
        if let Some(js) = b.positions.get(&a.chars[i]) {
            for &j in js {
                if j < b_lo {
                    continue;
                }
                if j >= b_hi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| run_len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_run_len.insert(j, k);
                if k > best.len {
                    best = Block {
                        a_start: i + 1 - k,
                        b_start: j + 1 - k,
                        len: k,
                    };
                }
            }
        }
        std::mem::swap(&mut run_len, &mut next_run_len);
        next_run_len.clear();
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prep(s: &str) -> PreparedText {
        PreparedText::new(s)
    }

    #[test]
    fn test_identical_ratio_is_one() {
        let a = prep("the quick brown fox");
        assert_eq!(ratio(&a, &a), 1.0);
    }

    #[test]
    fn test_empty_pair_is_identical() {
        assert_eq!(ratio(&prep(""), &prep("")), 1.0);
        assert_eq!(ratio(&prep(""), &prep("abc")), 0.0);
    }

    #[test]
    fn test_classic_example() {
        // "ab" first, then "cd" in the right-hand remainder
        let blocks = matching_blocks(&prep("abxcd"), &prep("abcd"));
        let matched: usize = blocks.iter().map(|b| b.len).sum();
        assert_eq!(matched, 4);
    }

    #[test]
    fn test_recurses_into_both_sides() {
        let a = prep("xxABCyyDEzz");
        let b = prep("ABCqqDE");
        let blocks = matching_blocks(&a, &b);
        assert_eq!(
            blocks,
            vec![
                Block { a_start: 2, b_start: 0, len: 3 },
                Block { a_start: 7, b_start: 5, len: 2 },
            ]
        );
    }

    #[test]
    fn test_longest_match_prefers_earliest() {
        let a = prep("abab");
        let b = prep("ab");
        let block = longest_match(&a, &b, 0, a.len(), 0, b.len());
        assert_eq!(block, Block { a_start: 0, b_start: 0, len: 2 });
    }

    #[test]
    fn test_multibyte_chars_count_once() {
        let a = prep("café");
        let b = prep("cafe");
        // 3 of 4 chars match on each side
        assert!((ratio(&a, &b) - 0.75).abs() < 1e-12);
    }
}
