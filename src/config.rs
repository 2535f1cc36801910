use std::env;
use std::path::Path;
use std::thread;

use serde::Serialize;

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::corpus::{self, Document};
use crate::error::ConfigurationError;
use crate::segment::{SegmentConfig, SegmentationPolicy};

/// Default cutoff for "only show strong matches" similarity views.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 90.0;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded by the binary at startup via dotenvy; command-line
/// flags override whatever is set here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Paragraphs shorter than this many characters are dropped (RATIONALIZER_MIN_CHARS)
    pub min_chars: usize,
    /// Segmentation heuristic (RATIONALIZER_POLICY: `blank-line` or `punctuation`)
    pub policy: SegmentationPolicy,
    /// Score cutoff for filtered similarity reports (RATIONALIZER_SIMILARITY_THRESHOLD)
    pub similarity_threshold: f64,
    /// Number of document versions kept in the extraction cache (RATIONALIZER_CACHE_CAPACITY)
    pub cache_capacity: usize,
    /// Worker threads for segmentation and scoring (RATIONALIZER_WORKERS, defaults to CPU count)
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_chars: 0,
            policy: SegmentationPolicy::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            workers: default_workers(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to defaults; set-but-invalid ones are errors
    /// rather than being silently ignored.
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            min_chars: match var("RATIONALIZER_MIN_CHARS") {
                Some(v) => parse_usize("RATIONALIZER_MIN_CHARS", &v)?,
                None => defaults.min_chars,
            },
            policy: match var("RATIONALIZER_POLICY") {
                Some(v) => v.parse()?,
                None => defaults.policy,
            },
            similarity_threshold: match var("RATIONALIZER_SIMILARITY_THRESHOLD") {
                Some(v) => v.trim().parse().map_err(|_| ConfigurationError::InvalidValue {
                    name: "RATIONALIZER_SIMILARITY_THRESHOLD",
                    value: v.clone(),
                    reason: "expected a number",
                })?,
                None => defaults.similarity_threshold,
            },
            cache_capacity: match var("RATIONALIZER_CACHE_CAPACITY") {
                Some(v) => parse_usize("RATIONALIZER_CACHE_CAPACITY", &v)?,
                None => defaults.cache_capacity,
            },
            workers: match var("RATIONALIZER_WORKERS") {
                Some(v) => parse_usize("RATIONALIZER_WORKERS", &v)?,
                None => defaults.workers,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges. Call again after applying command-line overrides.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(0.0..=100.0).contains(&self.similarity_threshold) {
            return Err(ConfigurationError::InvalidValue {
                name: "similarity_threshold",
                value: self.similarity_threshold.to_string(),
                reason: "must be between 0 and 100",
            });
        }
        if self.cache_capacity == 0 {
            return Err(ConfigurationError::InvalidValue {
                name: "cache_capacity",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        if self.workers == 0 {
            return Err(ConfigurationError::InvalidValue {
                name: "workers",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// The part of the configuration that changes segmentation output.
    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            min_chars: self.min_chars,
            policy: self.policy,
        }
    }

    /// Check the input folder and list the documents in it.
    /// Call this before starting any operation so bad input fails fast.
    pub fn require_input_folder(&self, folder: Option<&Path>) -> Result<Vec<Document>, ConfigurationError> {
        let folder = folder.ok_or(ConfigurationError::MissingInput)?;
        corpus::scan_folder(folder)
    }
}

fn parse_usize(name: &'static str, value: &str) -> Result<usize, ConfigurationError> {
    value.trim().parse().map_err(|_| ConfigurationError::InvalidValue {
        name,
        value: value.to_string(),
        reason: "expected a non-negative integer",
    })
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.min_chars, 0);
        assert_eq!(config.policy, SegmentationPolicy::BlankLine);
        assert_eq!(config.similarity_threshold, 90.0);
        assert_eq!(config.cache_capacity, 1024);
        assert!(config.workers >= 1);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = Config::from_lookup(lookup(&[
            ("RATIONALIZER_MIN_CHARS", "40"),
            ("RATIONALIZER_POLICY", "punctuation"),
            ("RATIONALIZER_SIMILARITY_THRESHOLD", "75.5"),
            ("RATIONALIZER_CACHE_CAPACITY", "16"),
            ("RATIONALIZER_WORKERS", "2"),
        ]))
        .unwrap();
        assert_eq!(config.segment_config().min_chars, 40);
        assert_eq!(config.policy, SegmentationPolicy::Punctuation);
        assert_eq!(config.similarity_threshold, 75.5);
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[("RATIONALIZER_MIN_CHARS", "-3")])).is_err());
        assert!(Config::from_lookup(lookup(&[("RATIONALIZER_SIMILARITY_THRESHOLD", "120")])).is_err());
        assert!(Config::from_lookup(lookup(&[("RATIONALIZER_CACHE_CAPACITY", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("RATIONALIZER_POLICY", "sentences")])).is_err());
    }

    #[test]
    fn test_require_input_folder_missing() {
        let config = Config::default();
        assert_eq!(
            config.require_input_folder(None).unwrap_err(),
            ConfigurationError::MissingInput
        );
    }
}
