//! Output module for run summaries and reports
//!
//! This module handles:
//! - The [`RunSummary`] record produced by every run
//! - Markdown reports of a run
//! - Console statistics from the store and run history

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_run_history, print_run_summary, print_statistics, StoreStatistics};
pub use summary::{RunSummary, TriggerType};

use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
