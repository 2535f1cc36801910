// Rectangular score table: every paragraph of a reference document against
// every paragraph of a corpus.
//
// Scoring is the same token-sorted block matching as the square matrix, but
// nothing is mirrored and there is no fixed diagonal. Reference rows are
// scored in chunks on the installed rayon pool, with a cancellation check
// before each chunk.

use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::OperationError;
use crate::progress::{CancelToken, ProgressObserver};

use super::matrix::row_chunks;
use super::{normalize, score, PreparedText};

/// rows × columns scores, row-major. Row i is reference paragraph i, column j
/// is corpus paragraph j.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    rows: usize,
    columns: usize,
    cells: Vec<f64>,
}

impl ScoreTable {
    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.cells.get(row * self.columns + column).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.columns;
        Some(&self.cells[start..start + self.columns])
    }

    /// One slice per reference paragraph, including when there are no columns.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |row| &self.cells[row * self.columns..(row + 1) * self.columns])
    }
}

impl Serialize for ScoreTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

/// Score every `reference` paragraph against every `corpus` paragraph.
pub fn compute_cross<R, C>(
    reference: &[R],
    corpus: &[C],
    cancel: &CancelToken,
    progress: &dyn ProgressObserver,
) -> Result<ScoreTable, OperationError>
where
    R: AsRef<str> + Sync,
    C: AsRef<str> + Sync,
{
    cancel.check()?;

    let left: Vec<PreparedText> = reference
        .par_iter()
        .map(|p| PreparedText::new(&normalize(p.as_ref())))
        .collect();
    let right: Vec<PreparedText> = corpus
        .par_iter()
        .map(|p| PreparedText::new(&normalize(p.as_ref())))
        .collect();

    progress.stage("Scoring", left.len());

    let scored: Vec<Vec<f64>> = row_chunks(left.len())
        .into_par_iter()
        .map(|rows| -> Result<Vec<f64>, OperationError> {
            cancel.check()?;
            let chunk: Vec<f64> = rows
                .clone()
                .flat_map(|i| right.iter().map(|other| score(&left[i], other)).collect::<Vec<_>>())
                .collect();
            progress.advance(rows.len());
            Ok(chunk)
        })
        .collect::<Result<_, OperationError>>()?;

    let table = ScoreTable {
        rows: left.len(),
        columns: right.len(),
        cells: scored.into_iter().flatten().collect(),
    };
    debug!(
        rows = table.rows,
        columns = table.columns,
        "Reference score table computed"
    );
    Ok(table)
}
