use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failure: {0}")]
    IoFailure(#[from] io::Error),

    #[error("existing store data is corrupt: {0}")]
    CorruptExistingData(String),
}

/// One persisted product URL with the domain that first surfaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub domain: String,
    pub discovered_at: DateTime<Utc>,
}

/// The accumulated set of discovered product URLs, keyed by URL
/// string. A URL appears at most once no matter which domain or run
/// discovered it; on conflict the first-seen record wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: BTreeMap<String, ProductRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&ProductRecord> {
        self.entries.get(url)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProductRecord)> {
        self.entries.iter()
    }

    /// Record a freshly discovered URL. Returns false when the URL was
    /// already present (the existing record is kept untouched).
    pub fn insert_discovery(&mut self, url: String, domain: String) -> bool {
        match self.entries.entry(url) {
            Entry::Vacant(slot) => {
                slot.insert(ProductRecord {
                    domain,
                    discovered_at: Utc::now(),
                });
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Union merge: every entry of `incoming` lands in `self` unless
    /// its URL is already present, in which case the existing record
    /// (domain and timestamp) is retained.
    pub fn merge_from(&mut self, incoming: ResultSet) {
        for (url, record) in incoming.entries {
            self.entries.entry(url).or_insert(record);
        }
    }
}

/// What `load` produced: the usable set, plus a warning when the
/// existing file was unreadable as data and had to be ignored.
pub struct LoadedResults {
    pub results: ResultSet,
    pub warning: Option<StoreError>,
}

/// File-backed persistence for the accumulated ResultSet.
///
/// Saves are atomic: the new content is written to a temp file in the
/// destination directory, synced, and renamed over the target. A crash
/// mid-save leaves either the old file or the new one, never a partial
/// write.
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted set. A missing file is an empty set; a file
    /// holding corrupt data yields an empty set plus a warning - the
    /// file itself is only replaced at save time, never here.
    pub fn load(&self) -> Result<LoadedResults, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No existing store at {}", self.path.display());
                return Ok(LoadedResults {
                    results: ResultSet::new(),
                    warning: None,
                });
            }
            Err(e) => return Err(StoreError::IoFailure(e)),
        };

        match serde_json::from_slice::<ResultSet>(&raw) {
            Ok(results) => {
                debug!(
                    "Loaded {} stored product URL(s) from {}",
                    results.len(),
                    self.path.display()
                );
                Ok(LoadedResults {
                    results,
                    warning: None,
                })
            }
            Err(e) => {
                warn!(
                    "Existing store {} is corrupt, starting from empty: {}",
                    self.path.display(),
                    e
                );
                Ok(LoadedResults {
                    results: ResultSet::new(),
                    warning: Some(StoreError::CorruptExistingData(e.to_string())),
                })
            }
        }
    }

    pub fn save(&self, results: &ResultSet) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let json = serde_json::to_vec_pretty(results).map_err(io::Error::other)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::IoFailure(e.error))?;

        debug!(
            "Saved {} product URL(s) to {}",
            results.len(),
            self.path.display()
        );
        Ok(())
    }
}
