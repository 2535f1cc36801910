// Rationalization pipeline: documents in, comparison tables out.
//
// Every operation follows the same shape:
// 1. Extract and segment each document (cached, parallel across documents)
// 2. Build the comparison table (presence index, similarity matrix, or
//    reference score table)
// 3. Hand back the finished table; nothing partial escapes on cancellation
//
// A document that fails to extract is logged and contributes no paragraphs.
// Only configuration problems and cancellation abort a whole operation.

pub mod engine;

pub use engine::{FilteredMatch, PercentageMatch, Rationalization, Rationalizer, ReferenceMatch};
