// Rationalizer: paragraph-level deduplication and similarity for document sets
//
// This is the library root. Each module corresponds to a stage of the
// comparison pipeline, leaves first.

pub mod cache;
pub mod config;
pub mod corpus;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod segment;
pub mod similarity;
