use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use rationalizer::config::Config;
use rationalizer::corpus::Document;
use rationalizer::extract::{ExtensionExtractor, PageExtractor};
use rationalizer::jobs::{JobOutput, JobRunner, Operation};
use rationalizer::output::terminal;
use rationalizer::pipeline::{Rationalization, Rationalizer};
use rationalizer::progress::ProgressObserver;
use rationalizer::report::{filter_presence, filter_table};
use rationalizer::segment::{self, SegmentationPolicy};

/// Rationalizer: find duplicated and near-duplicated paragraphs across documents.
///
/// Point it at a folder of PDF or text files to see which paragraphs differ
/// between them, or which paragraphs are close rewordings of each other.
#[derive(Parser)]
#[command(name = "rationalizer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which paragraphs appear in which documents
    Rationalize {
        /// Folder containing .pdf / .txt documents
        folder: PathBuf,

        #[command(flatten)]
        segmentation: SegmentationArgs,

        /// Show every paragraph, including ones shared by all documents
        #[arg(long)]
        all: bool,

        /// Print the result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Score every paragraph against every other (percentage match)
    Match {
        /// Folder containing .pdf / .txt documents
        folder: PathBuf,

        #[command(flatten)]
        segmentation: SegmentationArgs,

        /// Only show pairs at or above this score (default: RATIONALIZER_SIMILARITY_THRESHOLD)
        #[arg(long)]
        threshold: Option<f64>,

        /// Show the full similarity matrix instead of thresholded pairs
        #[arg(long)]
        full: bool,

        /// Score only this document's paragraphs against the folder
        #[arg(long, value_name = "FILE")]
        reference: Option<PathBuf>,

        /// Print the result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Print the paragraphs of a single document
    Segment {
        /// A .pdf or .txt file
        file: PathBuf,

        #[command(flatten)]
        segmentation: SegmentationArgs,

        /// Print the paragraphs as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Print the configuration as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for the environment configuration.
#[derive(Args)]
struct SegmentationArgs {
    /// Drop paragraphs shorter than this many characters
    #[arg(long)]
    min_chars: Option<usize>,

    /// Segmentation policy: blank-line or punctuation
    #[arg(long)]
    policy: Option<SegmentationPolicy>,

    /// Number of worker threads (default: CPU count)
    #[arg(long)]
    workers: Option<usize>,
}

impl SegmentationArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(min_chars) = self.min_chars {
            config.min_chars = min_chars;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rationalizer=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rationalize {
            folder,
            segmentation,
            all,
            json,
        } => {
            let config = load_config(&segmentation, None)?;
            let documents = config.require_input_folder(Some(&folder))?;
            let runner = start_runner(&config)?;

            let output = run_job(&runner, Operation::Rationalize { documents }, !json).await?;
            let JobOutput::Rationalization(result) = output else {
                anyhow::bail!("unexpected job output for rationalize");
            };

            let report = if all {
                result
            } else {
                let (keys, matrix) = filter_presence(&result.keys, &result.matrix);
                Rationalization { keys, matrix }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                terminal::display_rationalization(&report.keys, &report.matrix, !all);
            }
        }

        Commands::Match {
            folder,
            segmentation,
            threshold,
            full,
            reference,
            json,
        } => {
            let config = load_config(&segmentation, threshold)?;
            let mut documents = config.require_input_folder(Some(&folder))?;

            // The reference is never compared with itself
            let reference = match reference {
                Some(file) => {
                    let document = Document::from_path(documents.len(), &file)
                        .with_context(|| format!("Cannot read {}", file.display()))?;
                    let same_file = std::fs::canonicalize(&file).ok();
                    documents.retain(|d| std::fs::canonicalize(&d.path).ok() != same_file);
                    anyhow::ensure!(
                        !documents.is_empty(),
                        "No documents besides the reference in {}",
                        folder.display()
                    );
                    Some(document)
                }
                None => None,
            };
            let runner = start_runner(&config)?;

            let operation = match &reference {
                Some(reference) => Operation::ReferenceMatch {
                    reference: reference.clone(),
                    documents: documents.clone(),
                },
                None if full => Operation::PercentageMatch {
                    documents: documents.clone(),
                },
                None => Operation::FilteredPercentageMatch {
                    documents: documents.clone(),
                    min_score: config.similarity_threshold,
                },
            };

            match run_job(&runner, operation, !json).await? {
                JobOutput::PercentageMatch(result) if json => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                JobOutput::PercentageMatch(result) => {
                    terminal::display_matrix(&documents, &result.paragraphs, &result.matrix);
                }
                JobOutput::FilteredMatch(result) if json => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                JobOutput::FilteredMatch(result) => {
                    terminal::display_matches(
                        &documents,
                        &result.paragraphs,
                        &result.pairs,
                        result.min_score,
                    );
                }
                JobOutput::ReferenceMatch(result) if json && full => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                JobOutput::ReferenceMatch(result) => {
                    let min_score = if full { 0.0 } else { config.similarity_threshold };
                    let pairs = filter_table(&result.scores, min_score);
                    if json {
                        let view = serde_json::json!({
                            "reference": result.reference,
                            "paragraphs": result.paragraphs,
                            "min_score": min_score,
                            "pairs": pairs,
                        });
                        println!("{}", serde_json::to_string_pretty(&view)?);
                    } else {
                        let label = reference.as_ref().map(Document::label).unwrap_or_default();
                        terminal::display_reference_matches(
                            &label,
                            &documents,
                            &result.reference,
                            &result.paragraphs,
                            &pairs,
                            min_score,
                        );
                    }
                }
                JobOutput::Rationalization(_) => {
                    anyhow::bail!("unexpected job output for match");
                }
            }
        }

        Commands::Segment {
            file,
            segmentation,
            json,
        } => {
            let config = load_config(&segmentation, None)?;
            let document = Document::from_path(0, &file)
                .with_context(|| format!("Cannot read {}", file.display()))?;

            // Extraction errors are surfaced here rather than skipped
            let pages = ExtensionExtractor::default().extract_pages(&document.path)?;
            let paragraphs = segment::segment(&pages, &config.segment_config());
            info!(
                path = %document.path.display(),
                pages = pages.len(),
                paragraphs = paragraphs.len(),
                "Document segmented"
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&paragraphs)?);
            } else {
                terminal::display_paragraphs(&document.label(), &paragraphs);
            }
        }

        Commands::Config { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                terminal::display_config(&config);
            }
        }
    }

    Ok(())
}

/// Load configuration from the environment and apply command-line overrides.
fn load_config(args: &SegmentationArgs, threshold: Option<f64>) -> Result<Config> {
    let mut config = Config::load()?;
    args.apply(&mut config);
    if let Some(threshold) = threshold {
        config.similarity_threshold = threshold;
    }
    config.validate()?;
    Ok(config)
}

fn start_runner(config: &Config) -> Result<JobRunner> {
    let engine = Rationalizer::new(config)?;
    Ok(JobRunner::new(Arc::new(engine)))
}

/// Run one operation in the background, with a progress bar and Ctrl-C
/// cancellation.
async fn run_job(runner: &JobRunner, operation: Operation, show_progress: bool) -> Result<JobOutput> {
    let bar = if show_progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {msg:<10} [{bar:30}] {pos}/{len} ({eta})")
                .unwrap(),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let observer: Arc<dyn ProgressObserver> = Arc::new(bar);
    let handle = runner.submit_with_progress(operation, observer);
    let cancel = handle.cancel_token();

    let wait = handle.wait();
    tokio::pin!(wait);

    let result = tokio::select! {
        result = &mut wait => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling");
            eprintln!("{}", "Cancelling, waiting for workers to stop...".yellow());
            cancel.cancel();
            wait.await
        }
    };

    Ok(result?)
}
