//! Statistics from the document store
//!
//! This module provides functionality for extracting and displaying store
//! statistics, run history, and the outcome of a single run.

use crate::output::{OutputResult, RunSummary};
use crate::storage::DocumentStore;

/// Store-wide statistics
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of stored documents
    pub total_documents: u64,

    /// Stored documents per site folder, largest first
    pub documents_by_site: Vec<(String, u64)>,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunSummary>,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
/// * `history_limit` - How many recent runs to include
pub async fn load_statistics(store: &dyn DocumentStore, history_limit: usize) -> OutputResult<StoreStatistics> {
    let total_documents = store.stored_document_count().await?;
    let documents_by_site = store.documents_by_site().await?;
    let recent_runs = store.run_history(history_limit).await?;

    Ok(StoreStatistics {
        total_documents,
        documents_by_site,
        recent_runs,
    })
}

/// Prints store statistics to stdout
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Document Store ===\n");

    println!("Overview:");
    println!("  Total documents stored: {}", stats.total_documents);
    println!("  Sites with documents: {}", stats.documents_by_site.len());
    println!();

    if !stats.documents_by_site.is_empty() {
        println!("Documents by Site:");
        for (site, count) in &stats.documents_by_site {
            let percentage = if stats.total_documents > 0 {
                (*count as f64 / stats.total_documents as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", site, count, percentage);
        }
        println!();
    }

    print_run_history(&stats.recent_runs);
}

/// Prints one line per run, newest first
pub fn print_run_history(runs: &[RunSummary]) {
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return;
    }

    println!("Recent Runs ({}):", runs.len());
    for run in runs {
        let totals = run.totals();
        println!(
            "  #{} {} [{}] {}/{} sites ok, {} uploaded, {} unchanged, {:.1}s{}",
            run.id.unwrap_or_default(),
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.trigger,
            run.sites_successful(),
            run.sites_total(),
            totals.uploaded,
            totals.unchanged,
            run.duration_secs(),
            if run.cancelled { " (cancelled)" } else { "" }
        );
    }
    println!();
}

/// Prints the outcome of a single run
pub fn print_run_summary(summary: &RunSummary) {
    let totals = summary.totals();

    println!("=== Run Summary ===\n");
    println!(
        "Sites: {} total, {} successful, {} no documents, {} blocked, {} failed",
        summary.sites_total(),
        summary.sites_successful(),
        summary.sites_no_documents(),
        summary.sites_blocked(),
        summary.sites_failed()
    );
    println!(
        "Documents: {} found, {} new, {} changed, {} unchanged, {} uploaded, {} failed",
        totals.found, totals.new, totals.changed, totals.unchanged, totals.uploaded, totals.failed
    );
    println!();

    for site in &summary.sites {
        match &site.error {
            Some(error) => println!("  {} [{}]: {}", site.site_name, site.status, error),
            None => println!(
                "  {} [{}]: {} found, {} uploaded",
                site.site_name, site.status, site.counts.found, site.counts.uploaded
            ),
        }
    }

    if let Some(v) = &summary.validation {
        println!();
        println!(
            "Validation: {} uploaded, {} stored, {}",
            v.uploaded,
            v.stored,
            if v.matches { "match" } else { "mismatch" }
        );
    }

    for note in &summary.notes {
        println!("Note: {}", note);
    }

    println!("\nCompleted in {:.1}s", summary.duration_secs());
}
