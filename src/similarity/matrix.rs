// Square similarity matrix over a flattened paragraph list.
//
// Only the upper triangle is computed; the lower half is mirrored and the
// diagonal is fixed at 100. Rows are independent, so they are scored in
// chunks on the rayon pool the caller installs, with a cancellation check
// before each chunk.

use std::convert::Infallible;
use std::ops::Range;

use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::OperationError;
use crate::progress::{CancelToken, NoProgress, ProgressObserver};

use super::{normalize, score, PreparedText};

/// Rows handed to a worker at a time.
pub(crate) const ROW_CHUNK: usize = 16;

/// n × n similarity scores, row-major, in input paragraph order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    cells: Vec<f64>,
}

impl SimilarityMatrix {
    /// Build from explicit rows. Returns None unless the rows form a square.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return None;
        }
        Some(Self {
            size,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of paragraphs (rows and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.size || column >= self.size {
            return None;
        }
        self.cells.get(row * self.size + column).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.size {
            return None;
        }
        let start = row * self.size;
        Some(&self.cells[start..start + self.size])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.cells.chunks(self.size.max(1))
    }
}

impl Serialize for SimilarityMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

/// Compute the similarity matrix on the current rayon pool, no cancellation.
pub fn similarity_matrix<S: AsRef<str> + Sync>(paragraphs: &[S]) -> SimilarityMatrix {
    let built: Result<SimilarityMatrix, Infallible> =
        build(paragraphs, || Ok(()), &NoProgress);
    match built {
        Ok(matrix) => matrix,
        Err(never) => match never {},
    }
}

/// Compute the similarity matrix, honouring `cancel` between row chunks.
pub fn compute<S: AsRef<str> + Sync>(
    paragraphs: &[S],
    cancel: &CancelToken,
    progress: &dyn ProgressObserver,
) -> Result<SimilarityMatrix, OperationError> {
    cancel.check()?;
    build(paragraphs, || cancel.check(), progress)
}

/// Score the upper triangle in row chunks, calling `checkpoint` before each
/// chunk. The first checkpoint error aborts the whole matrix.
fn build<S, E, C>(
    paragraphs: &[S],
    checkpoint: C,
    progress: &dyn ProgressObserver,
) -> Result<SimilarityMatrix, E>
where
    S: AsRef<str> + Sync,
    E: Send,
    C: Fn() -> Result<(), E> + Sync,
{
    let n = paragraphs.len();

    let prepared: Vec<PreparedText> = paragraphs
        .par_iter()
        .map(|p| PreparedText::new(&normalize(p.as_ref())))
        .collect();

    progress.stage("Scoring", n);

    // Each chunk yields, per row i, the scores for columns i+1..n
    let scored: Vec<Vec<Vec<f64>>> = row_chunks(n)
        .into_par_iter()
        .map(|rows| -> Result<Vec<Vec<f64>>, E> {
            checkpoint()?;
            let upper: Vec<Vec<f64>> = rows
                .clone()
                .map(|i| {
                    ((i + 1)..n)
                        .map(|j| score(&prepared[i], &prepared[j]))
                        .collect()
                })
                .collect();
            progress.advance(rows.len());
            Ok(upper)
        })
        .collect::<Result<_, E>>()?;

    let mut cells = vec![0.0; n * n];
    for (i, upper) in scored.into_iter().flatten().enumerate() {
        cells[i * n + i] = 100.0;
        for (offset, value) in upper.into_iter().enumerate() {
            let j = i + 1 + offset;
            cells[i * n + j] = value;
            cells[j * n + i] = value;
        }
    }

    debug!(paragraphs = n, pairs = n * n.saturating_sub(1) / 2, "Similarity matrix computed");
    Ok(SimilarityMatrix { size: n, cells })
}

/// Split `0..n` into consecutive ranges of at most `ROW_CHUNK` rows.
pub(crate) fn row_chunks(n: usize) -> Vec<Range<usize>> {
    (0..n)
        .step_by(ROW_CHUNK)
        .map(|start| start..(start + ROW_CHUNK).min(n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_symmetric_with_unit_diagonal() {
        let paragraphs = [
            "the supplier shall deliver goods",
            "goods shall be delivered by the supplier",
            "payment is due within thirty days",
            "",
        ];
        let m = similarity_matrix(&paragraphs);
        assert_eq!(m.size(), 4);
        for i in 0..4 {
            assert_eq!(m.get(i, i), Some(100.0));
            for j in 0..4 {
                assert_eq!(m.get(i, j), m.get(j, i));
                let v = m.get(i, j).unwrap();
                assert!((0.0..=100.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_spans_multiple_chunks() {
        let paragraphs: Vec<String> = (0..(ROW_CHUNK * 2 + 3))
            .map(|i| format!("clause number {i} of the agreement"))
            .collect();
        let m = similarity_matrix(&paragraphs);
        assert_eq!(m.size(), paragraphs.len());
        assert_eq!(m.get(0, 34), m.get(34, 0));
        assert_eq!(m.get(34, 34), Some(100.0));
        assert_eq!(m.get(0, 1), Some(crate::similarity::similarity(&paragraphs[0], &paragraphs[1])));
    }

    #[test]
    fn test_uncancellable_path_matches_cancellable_one() {
        let paragraphs: Vec<String> = (0..(ROW_CHUNK + 5))
            .map(|i| format!("term {i} applies to the whole agreement"))
            .collect();
        let plain = similarity_matrix(&paragraphs);
        let tracked = compute(&paragraphs, &CancelToken::new(), &NoProgress).unwrap();
        assert_eq!(plain.size(), paragraphs.len());
        assert_eq!(plain, tracked);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = compute(&["a", "b"], &cancel, &NoProgress);
        assert!(matches!(result, Err(OperationError::Cancelled)));
    }

    #[test]
    fn test_empty_input() {
        let m = similarity_matrix::<&str>(&[]);
        assert!(m.is_empty());
        assert_eq!(m.rows().count(), 0);
        assert_eq!(serde_json::to_string(&m).unwrap(), "[]");
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(SimilarityMatrix::from_rows(vec![vec![100.0, 1.0], vec![1.0]]).is_none());
        let m = SimilarityMatrix::from_rows(vec![vec![100.0, 40.0], vec![40.0, 100.0]]).unwrap();
        assert_eq!(m.row(1), Some(&[40.0, 100.0][..]));
        assert_eq!(serde_json::to_string(&m).unwrap(), "[[100.0,40.0],[40.0,100.0]]");
    }
}
