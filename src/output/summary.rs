//! Run summary types
//!
//! A [`RunSummary`] is the single record a caller receives for every run, whether
//! the run completed, was cancelled, or could not load its configuration.

use crate::crawler::{PerSiteResult, SiteCounts, ValidationResult};
use crate::state::SiteStatus;
use chrono::{DateTime, Utc};
use std::fmt;

/// What started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerType {
    Manual,
    Scheduled,
    Orchestrated,
}

impl TriggerType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Orchestrated => "orchestrated",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "scheduled" => Some(Self::Scheduled),
            "orchestrated" => Some(Self::Orchestrated),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Aggregate of every site processed in one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// History row id, set once the summary has been persisted or read back
    pub id: Option<i64>,

    pub trigger: TriggerType,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// SHA-256 of the configuration file that produced the run, when known
    pub config_hash: Option<String>,

    /// One entry per site, in launch order
    pub sites: Vec<PerSiteResult>,

    /// Size of the merged ledger after the run
    pub ledger_entries: usize,

    pub validation: Option<ValidationResult>,

    /// The run was cut short by cancellation or timeout
    pub cancelled: bool,

    /// Run-level problems that did not belong to a single site
    pub notes: Vec<String>,
}

impl RunSummary {
    /// Creates an empty summary for a run that started at `started_at`
    pub fn new(trigger: TriggerType, started_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            trigger,
            started_at,
            finished_at: started_at,
            config_hash: None,
            sites: Vec::new(),
            ledger_entries: 0,
            validation: None,
            cancelled: false,
            notes: Vec::new(),
        }
    }

    /// Run duration in seconds
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Document counts summed over all sites
    pub fn totals(&self) -> SiteCounts {
        let mut totals = SiteCounts::default();
        for site in &self.sites {
            totals.add(&site.counts);
        }
        totals
    }

    pub fn sites_total(&self) -> usize {
        self.sites.len()
    }

    fn count_status(&self, status: SiteStatus) -> usize {
        self.sites.iter().filter(|s| s.status == status).count()
    }

    pub fn sites_successful(&self) -> usize {
        self.count_status(SiteStatus::Success)
    }

    pub fn sites_no_documents(&self) -> usize {
        self.count_status(SiteStatus::NoDocuments)
    }

    pub fn sites_blocked(&self) -> usize {
        self.count_status(SiteStatus::Blocked)
    }

    pub fn sites_failed(&self) -> usize {
        self.count_status(SiteStatus::Error)
    }

    /// Result for a site by id
    pub fn site(&self, site_id: &str) -> Option<&PerSiteResult> {
        self.sites.iter().find(|s| s.site_id == site_id)
    }
}
