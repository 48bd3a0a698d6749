//! JSON record log.
//!
//! # Storage layout
//!
//! ```text
//! ~/.daily-lotus/
//!   config.yaml            (optional, see `config`)
//!   records.json           (tracked records, one JSON array)
//!   records.dryrun.json    (what a dry-run check would have saved)
//!   candidates.json        (cached candidate compound ids)
//! ```
//!
//! # API pattern
//!
//! Path helpers take an explicit `home`; tests pass a `TempDir`. Saves go
//! through a `.tmp` sibling and a rename, so a crash mid-save leaves the
//! previous log intact and no record is ever half-written.

use std::cell::{Cell, RefCell};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::types::{EntityId, TrackedRecord};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.daily-lotus/`
pub fn app_dir_at(home: &Path) -> PathBuf {
    home.join(".daily-lotus")
}

/// `<home>/.daily-lotus/records.json`
pub fn records_path_at(home: &Path) -> PathBuf {
    app_dir_at(home).join("records.json")
}

/// `<home>/.daily-lotus/candidates.json`
pub fn candidates_path_at(home: &Path) -> PathBuf {
    app_dir_at(home).join("candidates.json")
}

/// Dry-run sibling of a record log: `records.json` → `records.dryrun.json`.
pub fn dry_run_path(records_path: &Path) -> PathBuf {
    records_path.with_extension("dryrun.json")
}

// ---------------------------------------------------------------------------
// 2. Load / save
// ---------------------------------------------------------------------------

/// Load every record from `path`. A missing file is an empty log.
pub fn load_from(path: &Path) -> Result<Vec<TrackedRecord>, StoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(io_err(path, err)),
    };
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `content` through a `<name>.tmp` sibling and a rename.
/// Missing parent directories are created.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Atomically replace the log at `path` with `records`.
pub fn save_to(path: &Path, records: &[TrackedRecord]) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(records)?;
    atomic_write(path, &json)
}

/// Append one record to the log at `path`.
pub fn append_to(path: &Path, record: TrackedRecord) -> Result<(), StoreError> {
    let mut records = load_from(path)?;
    records.push(record);
    save_to(path, &records)
}

/// Whether the compound–taxon pair was already published.
pub fn contains_occurrence(records: &[TrackedRecord], compound: &EntityId, taxon: &EntityId) -> bool {
    records.iter().any(|r| r.is_occurrence(compound, taxon))
}

// ---------------------------------------------------------------------------
// 3. RecordStore
// ---------------------------------------------------------------------------

/// Keyed storage of tracked records, read and written wholesale.
pub trait RecordStore {
    fn load_all(&self) -> Result<Vec<TrackedRecord>, StoreError>;
    fn save_all(&self, records: &[TrackedRecord]) -> Result<(), StoreError>;
}

/// [`RecordStore`] over a JSON file.
///
/// Loads and saves may target different files; a dry run reads the real log
/// and writes to [`dry_run_path`].
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    load_path: PathBuf,
    save_path: PathBuf,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            load_path: path.clone(),
            save_path: path,
        }
    }

    /// Redirect saves to `path` while still loading from the original log.
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }

    pub fn load_path(&self) -> &Path {
        &self.load_path
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }
}

impl RecordStore for JsonRecordStore {
    fn load_all(&self) -> Result<Vec<TrackedRecord>, StoreError> {
        load_from(&self.load_path)
    }

    fn save_all(&self, records: &[TrackedRecord]) -> Result<(), StoreError> {
        save_to(&self.save_path, records)
    }
}

/// In-memory [`RecordStore`]; counts saves so callers can assert on them.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RefCell<Vec<TrackedRecord>>,
    saves: Cell<usize>,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<TrackedRecord>) -> Self {
        Self {
            records: RefCell::new(records),
            saves: Cell::new(0),
        }
    }

    pub fn snapshot(&self) -> Vec<TrackedRecord> {
        self.records.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load_all(&self) -> Result<Vec<TrackedRecord>, StoreError> {
        Ok(self.records.borrow().clone())
    }

    fn save_all(&self, records: &[TrackedRecord]) -> Result<(), StoreError> {
        *self.records.borrow_mut() = records.to_vec();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_log_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let records = load_from(&records_path_at(tmp.path())).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn empty_log_when_file_blank() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("records.json");
        std::fs::write(&path, "\n").unwrap();
        assert!(load_from(&path).unwrap().is_empty());
    }

    #[test]
    fn atomic_write_replaces_existing_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("candidates.json");
        atomic_write(&path, "[\"Q1\"]").unwrap();
        atomic_write(&path, "[\"Q2\"]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[\"Q2\"]");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn save_creates_app_dir_and_cleans_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = records_path_at(tmp.path());
        save_to(&path, &[]).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn dry_run_path_is_sibling() {
        let path = PathBuf::from("/x/.daily-lotus/records.json");
        assert_eq!(
            dry_run_path(&path),
            PathBuf::from("/x/.daily-lotus/records.dryrun.json")
        );
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryRecordStore::default();
        store.save_all(&[]).unwrap();
        store.save_all(&[]).unwrap();
        assert_eq!(store.save_count(), 2);
    }
}
