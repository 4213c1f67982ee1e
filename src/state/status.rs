/// Status definitions for documents and sites
///
/// Both enums round-trip through the SQLite run history as short lowercase strings.
use std::fmt;

/// Classification of a downloaded document against the previous hash ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    /// URL absent from the previous ledger
    New,

    /// URL present with a different content hash
    Changed,

    /// URL present with the same content hash
    Unchanged,
}

impl DocumentStatus {
    /// Returns true if the content must be written to the store
    pub fn should_store(&self) -> bool {
        matches!(self, Self::New | Self::Changed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of crawling one site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteStatus {
    /// Entry page fetched and at least one candidate found
    Success,

    /// Entry page fetched but no candidates found
    NoDocuments,

    /// Entry page answered HTTP 403
    Blocked,

    /// Entry page failed for any other reason, or the site task did not finish
    Error,
}

impl SiteStatus {
    /// Returns true if the site produced a usable crawl
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::NoDocuments)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoDocuments => "no_documents",
            Self::Blocked => "blocked",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "no_documents" => Some(Self::NoDocuments),
            "blocked" => Some(Self::Blocked),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
