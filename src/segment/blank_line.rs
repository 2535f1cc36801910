// Blank-line segmentation with short-paragraph merging.
//
// Text layers of contracts and templates break lines inside paragraphs, so a
// paragraph is a run of non-blank lines. Headings, list items and signature
// blocks come out as tiny fragments; they are folded into one block emitted
// right before the next substantial paragraph.

use super::{char_len, SHORT_PARAGRAPH_WORDS};

/// Segment pages into paragraphs. See module docs for the rules.
pub fn segment<S: AsRef<str>>(pages: &[S], min_chars: usize) -> Vec<String> {
    // Pages are concatenated as-is; a paragraph may span a page break
    let text: String = pages.iter().map(AsRef::as_ref).collect();
    let raw = split_blocks(&text, min_chars);
    merge_short(raw)
}

/// Split on blank lines, joining the lines of each block with one space.
fn split_blocks(text: &str, min_chars: usize) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut buffer = String::new();

    for line in lines(text) {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut buffer, &mut blocks, min_chars);
        } else {
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(line);
        }
    }
    flush(&mut buffer, &mut blocks, min_chars);

    blocks
}

fn flush(buffer: &mut String, blocks: &mut Vec<String>, min_chars: usize) {
    if buffer.is_empty() {
        return;
    }
    let block = std::mem::take(buffer);
    if char_len(&block) >= min_chars {
        blocks.push(block);
    }
}

/// Fold paragraphs under the word threshold into the next emitted block.
fn merge_short(paragraphs: Vec<String>) -> Vec<String> {
    let mut merged = Vec::with_capacity(paragraphs.len());
    let mut pending = String::new();

    for paragraph in paragraphs {
        if paragraph.split_whitespace().count() < SHORT_PARAGRAPH_WORDS {
            if !pending.is_empty() {
                pending.push(' ');
            }
            pending.push_str(&paragraph);
        } else {
            if !pending.is_empty() {
                merged.push(std::mem::take(&mut pending));
            }
            merged.push(paragraph);
        }
    }
    if !pending.is_empty() {
        merged.push(pending);
    }

    merged
}

/// Split on every Unicode line boundary, treating `\r\n` as one break.
fn lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find(is_line_break) {
            Some(idx) => {
                let break_char = current[idx..].chars().next().unwrap_or('\n');
                let mut next = idx + break_char.len_utf8();
                if break_char == '\r' && current[next..].starts_with('\n') {
                    next += 1;
                }
                rest = Some(&current[next..]);
                Some(&current[..idx])
            }
            None => {
                rest = None;
                if current.is_empty() {
                    None
                } else {
                    Some(current)
                }
            }
        }
    })
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{b}' | '\u{c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}'
            | '\u{2029}'
    )
}
