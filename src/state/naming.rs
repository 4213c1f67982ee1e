use std::collections::HashSet;

use super::ledger::url_hash8;

const MAX_FOLDER_LEN: usize = 30;
const MAX_BASENAME_LEN: usize = 50;

/// Folder component of a storage key derived from a site name
///
/// Lowercased, spaces become `-`, anything outside `[a-z0-9-]` is dropped,
/// capped at 30 characters. Falls back to `unknown`.
pub fn sanitize_folder(site_name: &str) -> String {
    let folder: String = site_name
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .take(MAX_FOLDER_LEN)
        .collect();

    if folder.is_empty() {
        "unknown".to_string()
    } else {
        folder
    }
}

/// Basename component of a storage key
///
/// Characters outside `[A-Za-z0-9_-]` become `_`, capped at 50 characters.
/// Falls back to `document`.
pub fn sanitize_basename(base: &str) -> String {
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASENAME_LEN)
        .collect();

    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// Splits a filename at its last dot into (base, lowercased extension)
fn split_filename(filename: &str, default_ext: &str) -> (String, String) {
    match filename.rsplit_once('.') {
        Some((base, ext)) if !ext.is_empty() => (base.to_string(), ext.to_lowercase()),
        Some((base, _)) => (base.to_string(), default_ext.to_string()),
        None => (filename.to_string(), default_ext.to_string()),
    }
}

/// Derives the storage key `folder/hash8_base.ext` for a document
///
/// The key depends only on its inputs, so the same URL always maps to the same
/// key across runs.
///
/// # Arguments
///
/// * `site_name` - Display name of the site, used for the folder
/// * `url` - Document URL, hashed for the 8-character prefix
/// * `filename` - Inferred filename, split into base and extension
/// * `default_ext` - Extension used when the filename has none
///
/// # Examples
///
/// ```
/// use docwatch::state::derive_key;
///
/// let key = derive_key("Crown Prosecution Service", "https://x.gov/Annual Report.PDF", "Annual Report.PDF", "pdf");
/// assert!(key.starts_with("crown-prosecution-service/"));
/// assert!(key.ends_with("_Annual_Report.pdf"));
/// ```
pub fn derive_key(site_name: &str, url: &str, filename: &str, default_ext: &str) -> String {
    let (base, ext) = split_filename(filename, default_ext);
    format!(
        "{}/{}_{}.{}",
        sanitize_folder(site_name),
        url_hash8(url),
        sanitize_basename(&base),
        ext
    )
}

/// Hands out storage keys for one run and resolves repeats
///
/// A key already issued gets `_collision_<n>` inserted before its extension.
/// `n` starts at the running collision count and skips suffixes that are
/// already taken. Each repeat counts as exactly one collision.
#[derive(Debug, Default)]
pub struct StorageKeyNamer {
    issued: HashSet<String>,
    collisions: usize,
}

impl StorageKeyNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `key`, returning it unchanged or with a collision suffix
    ///
    /// # Returns
    ///
    /// The key to use and whether a collision was resolved.
    pub fn assign(&mut self, key: String) -> (String, bool) {
        if self.issued.insert(key.clone()) {
            return (key, false);
        }

        self.collisions += 1;
        let mut suffix = self.collisions;
        loop {
            let candidate = with_collision_suffix(&key, suffix);
            if self.issued.insert(candidate.clone()) {
                tracing::warn!(
                    "Storage key collision: {} renamed to {}",
                    key,
                    candidate
                );
                return (candidate, true);
            }
            suffix += 1;
        }
    }

    /// Number of collision suffixes issued so far
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}

fn with_collision_suffix(key: &str, n: usize) -> String {
    let (dir, file) = match key.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, key),
    };

    let renamed = match file.rsplit_once('.') {
        Some((base, ext)) => format!("{}_collision_{}.{}", base, n, ext),
        None => format!("{}_collision_{}", file, n),
    };

    match dir {
        Some(dir) => format!("{}/{}", dir, renamed),
        None => renamed,
    }
}
