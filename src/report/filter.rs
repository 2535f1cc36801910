// Report filters for presence and similarity tables.
//
// A paragraph found in every document tells the reader nothing (it's the
// shared boilerplate), and one found in none can't occur structurally. Both
// kinds of column are dropped, and then any document left with no marks.
//
// Similarity matrices are reduced to the cells at or above a score cutoff,
// which is how "only show matches above 90%" views are produced.

use serde::Serialize;

use crate::dedup::{PresenceMatrix, PresenceRow, UniqueParagraph};
use crate::similarity::{ScoreTable, SimilarityMatrix};

/// Drop columns present in all documents or in none, then all-zero rows.
pub fn filter_presence(
    keys: &[UniqueParagraph],
    matrix: &PresenceMatrix,
) -> (Vec<UniqueParagraph>, PresenceMatrix) {
    let documents = matrix.rows.len();

    let kept: Vec<usize> = (0..keys.len())
        .filter(|&column| {
            let present = matrix.column_count(column);
            present > 0 && present < documents
        })
        .collect();

    let filtered_keys = kept.iter().map(|&column| keys[column].clone()).collect();

    let rows = matrix
        .rows
        .iter()
        .map(|row| PresenceRow {
            label: row.label.clone(),
            cells: kept
                .iter()
                .map(|&column| row.cells.get(column).copied().unwrap_or(0))
                .collect(),
        })
        .filter(|row| !row.is_empty())
        .collect();

    (filtered_keys, PresenceMatrix { rows })
}

/// One similarity cell kept by a threshold filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredPair {
    pub row: usize,
    pub column: usize,
    pub score: f64,
}

/// All cells with `score >= min_score`, in row-major order.
pub fn filter_threshold(matrix: &SimilarityMatrix, min_score: f64) -> Vec<ScoredPair> {
    pairs_above(matrix.rows(), min_score)
}

/// Reference table cells with `score >= min_score`, in row-major order.
/// `row` indexes the reference paragraphs, `column` the corpus paragraphs.
pub fn filter_table(table: &ScoreTable, min_score: f64) -> Vec<ScoredPair> {
    pairs_above(table.rows(), min_score)
}

fn pairs_above<'a>(rows: impl Iterator<Item = &'a [f64]>, min_score: f64) -> Vec<ScoredPair> {
    rows.enumerate()
        .flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(move |(_, &score)| score >= min_score)
                .map(move |(column, &score)| ScoredPair { row, column, score })
        })
        .collect()
}

/// Row indices with at least one cell at or above `min_score`.
pub fn rows_above(matrix: &SimilarityMatrix, min_score: f64) -> Vec<usize> {
    matrix
        .rows()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|&score| score >= min_score))
        .map(|(row, _)| row)
        .collect()
}
