// Colored terminal output for rationalization and similarity reports.
//
// This module handles all terminal-specific formatting: colors, tables,
// previews. main.rs delegates here when --json is not requested.

use colored::Colorize;

use crate::config::Config;
use crate::corpus::Document;
use crate::dedup::{PresenceMatrix, UniqueParagraph};
use crate::report::ScoredPair;
use crate::segment::Paragraph;
use crate::similarity::SimilarityMatrix;

use super::{sanitize, truncate_chars};

const PREVIEW_CHARS: usize = 100;

/// Display the unique paragraph list and the presence table.
pub fn display_rationalization(keys: &[UniqueParagraph], matrix: &PresenceMatrix, filtered: bool) {
    if keys.is_empty() || matrix.rows.is_empty() {
        if filtered {
            println!("No differing paragraphs: every paragraph is shared by all documents.");
        } else {
            println!("No paragraphs found.");
        }
        return;
    }

    let title = if filtered {
        format!("=== Differing Paragraphs ({} of interest) ===", keys.len())
    } else {
        format!("=== Unique Paragraphs ({}) ===", keys.len())
    };
    println!("\n{}", title.bold());
    println!();

    for (i, unique) in keys.iter().enumerate() {
        let present = matrix.column_count(i);
        println!(
            "  {:>5}  {}  {}",
            format!("P{}", i + 1).bold(),
            format!("[{}/{} docs]", present, matrix.rows.len()).dimmed(),
            preview(&unique.text),
        );
        println!("         {}", unique.key.as_str()[..12].dimmed());
    }

    println!("\n{}", "=== Presence ===".bold());
    println!();

    let label_width = matrix
        .rows
        .iter()
        .map(|row| row.label.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(8, 40);

    for row in &matrix.rows {
        let marks: Vec<String> = row
            .cells
            .iter()
            .map(|&cell| {
                if cell == 1 {
                    "●".green().to_string()
                } else {
                    "·".dimmed().to_string()
                }
            })
            .collect();
        let label = truncate_chars(&row.label, label_width);
        println!("  {:<width$}  {}", label, marks.join(" "), width = label_width + 3);
    }
    println!();
}

/// Display thresholded similarity pairs. Each unordered pair is shown once
/// and a paragraph's match with itself is skipped.
pub fn display_matches(
    documents: &[Document],
    paragraphs: &[Paragraph],
    pairs: &[ScoredPair],
    min_score: f64,
) {
    let shown: Vec<&ScoredPair> = pairs.iter().filter(|p| p.row < p.column).collect();

    println!(
        "\n{}",
        format!(
            "=== Paragraph Matches ≥ {:.0}% ({} pairs, {} paragraphs) ===",
            min_score,
            shown.len(),
            paragraphs.len()
        )
        .bold()
    );
    println!();

    if shown.is_empty() {
        println!("  No paragraph pairs at or above the threshold.");
        println!();
        return;
    }

    for pair in shown {
        let (Some(left), Some(right)) = (paragraphs.get(pair.row), paragraphs.get(pair.column))
        else {
            continue;
        };
        println!(
            "  {}  {} #{} ↔ {} #{}",
            colorize_score(pair.score),
            document_label(documents, left.source_document_id),
            left.ordinal + 1,
            document_label(documents, right.source_document_id),
            right.ordinal + 1,
        );
        println!("      {}", preview(&left.text).dimmed());
        println!("      {}", preview(&right.text).dimmed());
    }
    println!();
}

/// Display reference-table pairs grouped by reference paragraph. Reference
/// paragraphs with no kept pair are listed once, without matches.
pub fn display_reference_matches(
    reference_label: &str,
    documents: &[Document],
    reference: &[Paragraph],
    paragraphs: &[Paragraph],
    pairs: &[ScoredPair],
    min_score: f64,
) {
    println!(
        "\n{}",
        format!(
            "=== {} vs {} documents: matches ≥ {:.0}% ({} pairs) ===",
            reference_label,
            documents.len(),
            min_score,
            pairs.len()
        )
        .bold()
    );
    println!();

    if reference.is_empty() {
        println!("  No paragraphs found in the reference document.");
        println!();
        return;
    }

    for (i, paragraph) in reference.iter().enumerate() {
        println!(
            "  {:>5}  {}",
            format!("R{}", i + 1).bold(),
            preview(&paragraph.text),
        );

        let mut matched: Vec<&ScoredPair> = pairs.iter().filter(|p| p.row == i).collect();
        if matched.is_empty() {
            println!("         {}", "no match".dimmed());
            continue;
        }
        matched.sort_by(|a, b| b.score.total_cmp(&a.score));

        for pair in matched {
            let Some(other) = paragraphs.get(pair.column) else {
                continue;
            };
            println!(
                "         {}  {} #{}  {}",
                colorize_score(pair.score),
                document_label(documents, other.source_document_id),
                other.ordinal + 1,
                preview(&other.text).dimmed(),
            );
        }
    }
    println!();
}

/// Display the full similarity matrix with a numbered paragraph legend.
pub fn display_matrix(documents: &[Document], paragraphs: &[Paragraph], matrix: &SimilarityMatrix) {
    if matrix.is_empty() {
        println!("No paragraphs found.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Similarity Matrix ({} paragraphs) ===", matrix.size()).bold()
    );
    println!();

    for (i, paragraph) in paragraphs.iter().enumerate() {
        println!(
            "  {:>5}  {} #{}  {}",
            format!("P{}", i + 1).bold(),
            document_label(documents, paragraph.source_document_id),
            paragraph.ordinal + 1,
            preview(&paragraph.text).dimmed(),
        );
    }
    println!();

    let header: String = (1..=matrix.size()).map(|i| format!("{:>7}", format!("P{i}"))).collect();
    println!("  {:>5}{}", "", header.dimmed());
    for (i, row) in matrix.rows().enumerate() {
        let cells: String = row
            .iter()
            .enumerate()
            .map(|(j, &score)| {
                let text = format!("{score:>7.2}");
                if i == j {
                    text.dimmed().to_string()
                } else if score >= 90.0 {
                    text.yellow().bold().to_string()
                } else {
                    text
                }
            })
            .collect();
        println!("  {:>5}{}", format!("P{}", i + 1).bold(), cells);
    }
    println!();
}

/// Display one document's paragraphs in order.
pub fn display_paragraphs(label: &str, paragraphs: &[String]) {
    println!(
        "\n{}",
        format!("=== {} ({} paragraphs) ===", label, paragraphs.len()).bold()
    );
    println!();
    for (i, text) in paragraphs.iter().enumerate() {
        let words = text.split_whitespace().count();
        println!(
            "  {:>4}. {} {}",
            i + 1,
            format!("[{words} words]").dimmed(),
            sanitize(text)
        );
    }
    println!();
}

/// Display the effective configuration.
pub fn display_config(config: &Config) {
    println!("\n{}", "=== Rationalizer Configuration ===".bold());
    println!("  Segmentation policy:  {}", config.policy);
    println!("  Minimum characters:   {}", config.min_chars);
    println!("  Similarity threshold: {:.2}", config.similarity_threshold);
    println!("  Cache capacity:       {} documents", config.cache_capacity);
    println!("  Worker threads:       {}", config.workers);
    println!();
}

fn preview(text: &str) -> String {
    truncate_chars(&sanitize(text), PREVIEW_CHARS)
}

fn document_label(documents: &[Document], id: usize) -> String {
    documents
        .iter()
        .find(|d| d.id == id)
        .map(Document::label)
        .unwrap_or_else(|| format!("document {id}"))
}

/// Colorize a similarity percentage.
fn colorize_score(score: f64) -> colored::ColoredString {
    let text = format!("{score:>6.2}%");
    if score >= 100.0 {
        text.red().bold()
    } else if score >= 95.0 {
        text.bright_red()
    } else if score >= 90.0 {
        text.yellow()
    } else {
        text.normal()
    }
}
