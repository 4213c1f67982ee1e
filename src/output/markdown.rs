//! Markdown summary generation
//!
//! This module generates human-readable markdown reports of a run, including
//! per-site outcomes, document counts, validation and run notes.

use crate::output::{OutputResult, RunSummary};
use crate::state::SiteStatus;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report for `summary` to `output_path`
///
/// # Arguments
///
/// * `summary` - The run summary
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn status_label(status: SiteStatus) -> &'static str {
    match status {
        SiteStatus::Success => "Success",
        SiteStatus::NoDocuments => "No documents",
        SiteStatus::Blocked => "Blocked",
        SiteStatus::Error => "Error",
    }
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();
    let totals = summary.totals();

    md.push_str("# Docwatch Run Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    if let Some(id) = summary.id {
        md.push_str(&format!("- **Run ID**: {}\n", id));
    }
    md.push_str(&format!("- **Trigger**: {}\n", summary.trigger));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!("- **Duration**: {:.1} seconds\n", summary.duration_secs()));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    if summary.cancelled {
        md.push_str("- **Cancelled**: yes\n");
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Sites**: {} ({} successful, {} no documents, {} blocked, {} failed)\n",
        summary.sites_total(),
        summary.sites_successful(),
        summary.sites_no_documents(),
        summary.sites_blocked(),
        summary.sites_failed()
    ));
    md.push_str(&format!("- **Documents Found**: {}\n", totals.found));
    md.push_str(&format!("- **New**: {}\n", totals.new));
    md.push_str(&format!("- **Changed**: {}\n", totals.changed));
    md.push_str(&format!("- **Unchanged**: {}\n", totals.unchanged));
    md.push_str(&format!("- **Uploaded**: {}\n", totals.uploaded));
    md.push_str(&format!("- **Failed**: {}\n", totals.failed));
    if totals.rejected > 0 {
        md.push_str(&format!("- **Guidance Rejected**: {}\n", totals.rejected));
    }
    if totals.collisions > 0 {
        md.push_str(&format!("- **Key Collisions**: {}\n", totals.collisions));
    }
    md.push_str(&format!("- **Ledger Entries**: {}\n\n", summary.ledger_entries));

    // Per-site table
    if !summary.sites.is_empty() {
        md.push_str("## Sites\n\n");
        md.push_str("| Site | Status | Found | New | Changed | Unchanged | Uploaded | Failed |\n");
        md.push_str("|------|--------|-------|-----|---------|-----------|----------|--------|\n");
        for site in &summary.sites {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                site.site_name,
                status_label(site.status),
                site.counts.found,
                site.counts.new,
                site.counts.changed,
                site.counts.unchanged,
                site.counts.uploaded,
                site.counts.failed
            ));
        }
        md.push('\n');
    }

    // Site errors
    let errors: Vec<_> = summary
        .sites
        .iter()
        .filter_map(|s| s.error.as_ref().map(|e| (&s.site_name, e)))
        .collect();
    if !errors.is_empty() {
        md.push_str("## Site Errors\n\n");
        for (name, error) in errors {
            md.push_str(&format!("- **{}**: {}\n", name, error));
        }
        md.push('\n');
    }

    // Validation
    md.push_str("## Validation\n\n");
    match &summary.validation {
        Some(v) => {
            md.push_str(&format!("- **Uploaded This Run**: {}\n", v.uploaded));
            md.push_str(&format!("- **Stored In Total**: {}\n", v.stored));
            md.push_str(&format!(
                "- **Counts Match**: {}\n",
                if v.matches { "yes" } else { "no" }
            ));
            if let Some(accuracy) = v.accuracy {
                md.push_str(&format!("- **Accuracy**: {:.1}%\n", accuracy));
            }
        }
        None => md.push_str("Validation was not performed.\n"),
    }
    md.push('\n');

    if !summary.notes.is_empty() {
        md.push_str("## Notes\n\n");
        for note in &summary.notes {
            md.push_str(&format!("- {}\n", note));
        }
        md.push('\n');
    }

    md
}
