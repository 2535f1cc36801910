// The Rationalizer engine: owns the extractor, the extraction cache and a
// bounded worker pool, and exposes the comparison operations.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::ExtractionCache;
use crate::config::Config;
use crate::corpus::Document;
use crate::dedup::{DedupIndex, PresenceMatrix, UniqueParagraph};
use crate::error::OperationError;
use crate::extract::{ExtensionExtractor, PageExtractor};
use crate::progress::{CancelToken, NoProgress, ProgressObserver};
use crate::report::{filter_threshold, ScoredPair};
use crate::segment::{self, Paragraph, SegmentConfig};
use crate::similarity::{cross, matrix, ScoreTable, SimilarityMatrix};

/// Result of `rationalize`: sorted unique paragraphs and the full
/// documents × paragraphs presence matrix (unfiltered).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rationalization {
    pub keys: Vec<UniqueParagraph>,
    pub matrix: PresenceMatrix,
}

/// Result of `percentage_match`: every paragraph in document order, then
/// paragraph order, and the square similarity matrix over that list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PercentageMatch {
    pub paragraphs: Vec<Paragraph>,
    pub matrix: SimilarityMatrix,
}

/// Result of `filtered_percentage_match`: the same paragraph list plus only
/// the cells at or above the cutoff.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilteredMatch {
    pub paragraphs: Vec<Paragraph>,
    pub min_score: f64,
    pub pairs: Vec<ScoredPair>,
}

/// Result of `reference_match`: the reference document's paragraphs, the
/// corpus paragraphs in document order, and one row of scores per reference
/// paragraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceMatch {
    pub reference: Vec<Paragraph>,
    pub paragraphs: Vec<Paragraph>,
    pub scores: ScoreTable,
}

/// Runs comparison operations over a set of documents.
///
/// Cheap to share behind an `Arc`: all methods take `&self`, and the cache is
/// the only mutable state.
pub struct Rationalizer {
    extractor: Arc<dyn PageExtractor>,
    cache: Arc<ExtractionCache>,
    segment_config: SegmentConfig,
    pool: rayon::ThreadPool,
}

impl Rationalizer {
    /// Build an engine with the default extension-dispatching extractor and
    /// a fresh cache sized from `config`.
    pub fn new(config: &Config) -> Result<Self, OperationError> {
        config.validate()?;
        Self::with_parts(
            Arc::new(ExtensionExtractor::default()),
            Arc::new(ExtractionCache::new(config.cache_capacity)),
            config.segment_config(),
            config.workers,
        )
    }

    /// Build an engine from explicit parts. Tests use this to inject a fake
    /// extractor; callers can share one cache between engines.
    pub fn with_parts(
        extractor: Arc<dyn PageExtractor>,
        cache: Arc<ExtractionCache>,
        segment_config: SegmentConfig,
        workers: usize,
    ) -> Result<Self, OperationError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("rationalizer-{i}"))
            .build()
            .map_err(|e| OperationError::WorkerPool(e.to_string()))?;

        debug!(
            workers = pool.current_num_threads(),
            min_chars = segment_config.min_chars,
            policy = %segment_config.policy,
            "Rationalizer ready"
        );

        Ok(Self {
            extractor,
            cache,
            segment_config,
            pool,
        })
    }

    pub fn segment_config(&self) -> SegmentConfig {
        self.segment_config
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    /// Paragraphs of one document, from the cache when possible.
    ///
    /// Extraction failures are logged and yield an empty list. The failure is
    /// cached like any other result, so an unchanged broken file is not
    /// re-read on every run.
    pub fn paragraphs_for(&self, document: &Document) -> Arc<Vec<String>> {
        self.cache
            .get_or_compute(document, &self.segment_config, || {
                match self.extractor.extract_pages(&document.path) {
                    Ok(pages) => {
                        let paragraphs = segment::segment(&pages, &self.segment_config);
                        debug!(
                            path = %document.path.display(),
                            pages = pages.len(),
                            paragraphs = paragraphs.len(),
                            "Document segmented"
                        );
                        paragraphs
                    }
                    Err(e) => {
                        warn!(
                            path = %document.path.display(),
                            error = %e,
                            "Failed to extract document, skipping"
                        );
                        Vec::new()
                    }
                }
            })
    }

    /// Segment every document on the worker pool. The output is parallel to
    /// `documents` regardless of scheduling.
    pub fn segment_documents(
        &self,
        documents: &[Document],
        cancel: &CancelToken,
        progress: &dyn ProgressObserver,
    ) -> Result<Vec<Arc<Vec<String>>>, OperationError> {
        cancel.check()?;
        progress.stage("Segmenting", documents.len());

        self.pool.install(|| {
            documents
                .par_iter()
                .map(|document| -> Result<Arc<Vec<String>>, OperationError> {
                    cancel.check()?;
                    let paragraphs = self.paragraphs_for(document);
                    progress.advance(1);
                    Ok(paragraphs)
                })
                .collect()
        })
    }

    /// Build the unique-paragraph index and presence matrix.
    pub fn rationalize(&self, documents: &[Document]) -> Result<Rationalization, OperationError> {
        self.rationalize_with(documents, &CancelToken::new(), &NoProgress)
    }

    pub fn rationalize_with(
        &self,
        documents: &[Document],
        cancel: &CancelToken,
        progress: &dyn ProgressObserver,
    ) -> Result<Rationalization, OperationError> {
        let result = self.build_rationalization(documents, cancel, progress);
        progress.finish();
        result
    }

    fn build_rationalization(
        &self,
        documents: &[Document],
        cancel: &CancelToken,
        progress: &dyn ProgressObserver,
    ) -> Result<Rationalization, OperationError> {
        let started = Instant::now();
        let per_document = self.segment_documents(documents, cancel, progress)?;
        cancel.check()?;

        let lists: Vec<&[String]> = per_document.iter().map(|p| p.as_slice()).collect();
        let (keys, matrix) = DedupIndex::build(documents, &lists).into_parts();

        info!(
            documents = documents.len(),
            unique_paragraphs = keys.len(),
            "Rationalization completed in {:.2} seconds",
            started.elapsed().as_secs_f64()
        );
        Ok(Rationalization { keys, matrix })
    }

    /// Score every paragraph against every other.
    pub fn percentage_match(&self, documents: &[Document]) -> Result<PercentageMatch, OperationError> {
        self.percentage_match_with(documents, &CancelToken::new(), &NoProgress)
    }

    pub fn percentage_match_with(
        &self,
        documents: &[Document],
        cancel: &CancelToken,
        progress: &dyn ProgressObserver,
    ) -> Result<PercentageMatch, OperationError> {
        let result = self.build_percentage_match(documents, cancel, progress);
        progress.finish();
        result
    }

    fn build_percentage_match(
        &self,
        documents: &[Document],
        cancel: &CancelToken,
        progress: &dyn ProgressObserver,
    ) -> Result<PercentageMatch, OperationError> {
        let started = Instant::now();
        let per_document = self.segment_documents(documents, cancel, progress)?;
        let paragraphs = flatten(documents, &per_document);

        let texts: Vec<&str> = paragraphs.iter().map(|p| p.text.as_str()).collect();
        let matrix = self
            .pool
            .install(|| matrix::compute(&texts, cancel, progress))?;

        info!(
            documents = documents.len(),
            paragraphs = paragraphs.len(),
            "Percentage match completed in {:.2} seconds",
            started.elapsed().as_secs_f64()
        );
        Ok(PercentageMatch { paragraphs, matrix })
    }

    /// Percentage match reduced to the cells scoring at least `min_score`.
    pub fn filtered_percentage_match(
        &self,
        documents: &[Document],
        min_score: f64,
    ) -> Result<FilteredMatch, OperationError> {
        self.filtered_percentage_match_with(documents, min_score, &CancelToken::new(), &NoProgress)
    }

    pub fn filtered_percentage_match_with(
        &self,
        documents: &[Document],
        min_score: f64,
        cancel: &CancelToken,
        progress: &dyn ProgressObserver,
    ) -> Result<FilteredMatch, OperationError> {
        let result = self.build_percentage_match(documents, cancel, progress);
        progress.finish();
        let PercentageMatch { paragraphs, matrix } = result?;

        let pairs = filter_threshold(&matrix, min_score);
        debug!(min_score, kept = pairs.len(), "Similarity cells filtered");

        Ok(FilteredMatch {
            paragraphs,
            min_score,
            pairs,
        })
    }

    /// Score each paragraph of `reference` against every paragraph of
    /// `documents`, giving a |reference| × |corpus| table.
    pub fn reference_match(
        &self,
        reference: &Document,
        documents: &[Document],
    ) -> Result<ReferenceMatch, OperationError> {
        self.reference_match_with(reference, documents, &CancelToken::new(), &NoProgress)
    }

    pub fn reference_match_with(
        &self,
        reference: &Document,
        documents: &[Document],
        cancel: &CancelToken,
        progress: &dyn ProgressObserver,
    ) -> Result<ReferenceMatch, OperationError> {
        let result = self.build_reference_match(reference, documents, cancel, progress);
        progress.finish();
        result
    }

    fn build_reference_match(
        &self,
        reference: &Document,
        documents: &[Document],
        cancel: &CancelToken,
        progress: &dyn ProgressObserver,
    ) -> Result<ReferenceMatch, OperationError> {
        let started = Instant::now();

        // Segment the reference with the corpus so it shares the pool and cache
        let all: Vec<Document> = std::iter::once(reference.clone())
            .chain(documents.iter().cloned())
            .collect();
        let per_document = self.segment_documents(&all, cancel, progress)?;

        let reference_paragraphs = flatten(&all[..1], &per_document[..1]);
        let paragraphs = flatten(documents, &per_document[1..]);

        let left: Vec<&str> = reference_paragraphs.iter().map(|p| p.text.as_str()).collect();
        let right: Vec<&str> = paragraphs.iter().map(|p| p.text.as_str()).collect();
        let scores = self
            .pool
            .install(|| cross::compute_cross(&left, &right, cancel, progress))?;

        info!(
            reference = %reference.path.display(),
            documents = documents.len(),
            reference_paragraphs = reference_paragraphs.len(),
            paragraphs = paragraphs.len(),
            "Reference match completed in {:.2} seconds",
            started.elapsed().as_secs_f64()
        );
        Ok(ReferenceMatch {
            reference: reference_paragraphs,
            paragraphs,
            scores,
        })
    }
}

/// Every paragraph in document order, then paragraph order.
fn flatten(documents: &[Document], per_document: &[Arc<Vec<String>>]) -> Vec<Paragraph> {
    documents
        .iter()
        .zip(per_document)
        .flat_map(|(document, texts)| Paragraph::from_texts(document.id, texts))
        .collect()
}
