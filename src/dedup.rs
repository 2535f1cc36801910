// Exact-duplicate index: which paragraphs appear in which documents.
//
// Paragraph identity is a SHA-256 digest of the exact text, so two paragraphs
// collapse only when they are byte-for-byte equal after segmentation. The
// unique keys are sorted by digest, which makes column order a pure function
// of the corpus contents rather than of scan or scheduling order.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::corpus::Document;

/// Hex SHA-256 of a paragraph's exact text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn of(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One column of the presence matrix: the key and the text it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueParagraph {
    pub key: CanonicalKey,
    pub text: String,
}

/// One row of the presence matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceRow {
    /// Document basename.
    pub label: String,
    /// 1 if the document contains the paragraph at that column, else 0.
    pub cells: Vec<u8>,
}

impl PresenceRow {
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }
}

/// Documents × unique paragraphs, 0/1 membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PresenceMatrix {
    pub rows: Vec<PresenceRow>,
}

impl PresenceMatrix {
    /// Number of documents (in caller order) that contain column `column`.
    pub fn column_count(&self, column: usize) -> usize {
        self.rows
            .iter()
            .filter(|row| row.cells.get(column).copied() == Some(1))
            .count()
    }
}

/// The built index: sorted unique paragraphs plus the presence matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupIndex {
    keys: Vec<UniqueParagraph>,
    matrix: PresenceMatrix,
}

impl DedupIndex {
    /// Build the index from each document's paragraph list.
    ///
    /// `paragraphs_per_document` is parallel to `documents`; a missing entry
    /// (shorter slice) is treated as a document with no paragraphs. Rows keep
    /// the order of `documents`.
    pub fn build<P: AsRef<[String]>>(documents: &[Document], paragraphs_per_document: &[P]) -> Self {
        let keyed = key_paragraphs(documents.len(), paragraphs_per_document);

        // Per-document key sets; duplicates inside one document collapse here
        let per_document: Vec<HashSet<&CanonicalKey>> = keyed
            .iter()
            .map(|paras| paras.iter().map(|(key, _)| key).collect())
            .collect();

        // BTreeMap gives the sorted global key set and remembers the text
        let mut unique: BTreeMap<CanonicalKey, &str> = BTreeMap::new();
        for (key, text) in keyed.iter().flatten() {
            if !unique.contains_key(key) {
                unique.insert(key.clone(), *text);
            }
        }

        let keys: Vec<UniqueParagraph> = unique
            .into_iter()
            .map(|(key, text)| UniqueParagraph {
                key,
                text: text.to_string(),
            })
            .collect();

        let rows = documents
            .iter()
            .zip(&per_document)
            .map(|(doc, present)| PresenceRow {
                label: doc.label(),
                cells: keys
                    .iter()
                    .map(|unique| u8::from(present.contains(&unique.key)))
                    .collect(),
            })
            .collect();

        Self {
            keys,
            matrix: PresenceMatrix { rows },
        }
    }

    pub fn keys(&self) -> &[UniqueParagraph] {
        &self.keys
    }

    pub fn matrix(&self) -> &PresenceMatrix {
        &self.matrix
    }

    pub fn into_parts(self) -> (Vec<UniqueParagraph>, PresenceMatrix) {
        (self.keys, self.matrix)
    }
}

/// Hash every paragraph exactly once, one list per document. Documents past
/// the end of `paragraphs_per_document` get an empty list.
fn key_paragraphs<P: AsRef<[String]>>(
    documents: usize,
    paragraphs_per_document: &[P],
) -> Vec<Vec<(CanonicalKey, &str)>> {
    (0..documents)
        .map(|i| {
            paragraphs_per_document
                .get(i)
                .map(|paras| {
                    paras
                        .as_ref()
                        .iter()
                        .map(|text| (CanonicalKey::of(text), text.as_str()))
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn docs(names: &[&str]) -> Vec<Document> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Document::new(i, *n, SystemTime::UNIX_EPOCH))
            .collect()
    }

    fn paras(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonical_key_is_sha256_hex() {
        let key = CanonicalKey::of("hello world");
        assert_eq!(
            key.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_ne!(CanonicalKey::of("hello world"), CanonicalKey::of("hello world."));
    }

    #[test]
    fn test_each_paragraph_keyed_once_in_order() {
        let lists = [paras(&["alpha", "alpha", "beta"])];
        let keyed = key_paragraphs(2, &lists);

        assert_eq!(keyed.len(), 2);
        assert!(keyed[1].is_empty());
        let texts: Vec<&str> = keyed[0].iter().map(|(_, text)| *text).collect();
        assert_eq!(texts, vec!["alpha", "alpha", "beta"]);
        for (key, text) in &keyed[0] {
            assert_eq!(*key, CanonicalKey::of(text));
        }
    }

    #[test]
    fn test_keys_sorted_and_rows_in_caller_order() {
        let documents = docs(&["/x/b.pdf", "/x/a.pdf"]);
        let index = DedupIndex::build(
            &documents,
            &[paras(&["beta", "alpha"]), paras(&["alpha", "alpha"])],
        );

        let keys: Vec<&CanonicalKey> = index.keys().iter().map(|k| &k.key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(index.keys().len(), 2);

        let labels: Vec<&str> = index.matrix().rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["b.pdf", "a.pdf"]);
    }

    #[test]
    fn test_presence_matches_text_membership() {
        let documents = docs(&["one.txt", "two.txt"]);
        let lists = [paras(&["shared", "only one"]), paras(&["shared"])];
        let index = DedupIndex::build(&documents, &lists);

        for (row, list) in index.matrix().rows.iter().zip(&lists) {
            for (cell, unique) in row.cells.iter().zip(index.keys()) {
                assert_eq!(*cell == 1, list.contains(&unique.text));
            }
        }
    }

    #[test]
    fn test_missing_paragraph_list_is_empty_row() {
        let documents = docs(&["one.txt", "two.txt"]);
        let index = DedupIndex::build(&documents, &[paras(&["lonely"])]);
        assert_eq!(index.matrix().rows.len(), 2);
        assert!(index.matrix().rows[1].is_empty());
        assert_eq!(index.matrix().column_count(0), 1);
    }
}
