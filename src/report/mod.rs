// Report shaping: turns full result tables into the views operators read.
//
// Filters never mutate their input; they return new, smaller tables.

pub mod filter;

pub use filter::{filter_presence, filter_table, filter_threshold, rows_above, ScoredPair};
