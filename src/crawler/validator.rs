//! Post-run consistency check
//!
//! Compares the number of documents uploaded during a run with the store's own
//! document count. The result is advisory and never changes the run outcome.

use crate::storage::DocumentStore;
use chrono::{DateTime, Utc};

/// Uploaded vs stored document counts
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub uploaded: u64,
    /// Total documents held by the store after the run
    pub stored: u64,
    pub matches: bool,
    /// Stored count as a percentage of uploads, `None` when nothing was uploaded
    pub accuracy: Option<f64>,
    pub checked_at: DateTime<Utc>,
}

impl ValidationResult {
    pub fn new(uploaded: u64, stored: u64) -> Self {
        let accuracy = (uploaded > 0).then(|| stored as f64 / uploaded as f64 * 100.0);
        Self {
            uploaded,
            stored,
            matches: uploaded == stored,
            accuracy,
            checked_at: Utc::now(),
        }
    }
}

/// Reads the authoritative document count and compares it with `uploaded`
///
/// # Returns
///
/// * `Some(ValidationResult)` - The store answered
/// * `None` - The count could not be read; a warning is logged
pub async fn validate_upload_count(store: &dyn DocumentStore, uploaded: u64) -> Option<ValidationResult> {
    match store.stored_document_count().await {
        Ok(stored) => {
            let result = ValidationResult::new(uploaded, stored);
            if result.matches {
                tracing::info!("Validation passed: {} uploaded, {} stored", uploaded, stored);
            } else {
                tracing::warn!(
                    "Validation mismatch: {} uploaded this run, {} stored in total",
                    uploaded,
                    stored
                );
            }
            Some(result)
        }
        Err(e) => {
            tracing::warn!("Validation skipped, document count unavailable: {}", e);
            None
        }
    }
}
