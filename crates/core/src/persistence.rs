//! Stamp persistence
//!
//! Persisted stamp sets are modeled as an explicit, injected archive with
//! a load/save contract instead of ambient process-wide storage. The
//! session talks to [`StampArchive`]; hosts pick the JSON file
//! implementation or supply their own.

use crate::stamp::Stamp;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

/// Load/save contract for a persisted stamp set
pub trait StampArchive {
    fn load(&self) -> Result<Vec<Stamp>, PersistenceError>;
    fn save(&self, stamps: &[Stamp]) -> Result<(), PersistenceError>;
}

/// JSON file archive
///
/// Writes atomically through a temp file and rename, so a crash mid-save
/// never leaves a truncated archive behind.
#[derive(Debug, Clone)]
pub struct JsonStampArchive {
    path: PathBuf,
}

impl JsonStampArchive {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StampArchive for JsonStampArchive {
    fn load(&self) -> Result<Vec<Stamp>, PersistenceError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&self.path)?;
        serde_json::from_str(&json).map_err(|e| PersistenceError::Deserialization(e.to_string()))
    }

    fn save(&self, stamps: &[Stamp]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(stamps)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// In-memory archive for hosts without a filesystem (and for tests)
#[derive(Debug, Default)]
pub struct MemoryStampArchive {
    stamps: RefCell<Vec<Stamp>>,
}

impl MemoryStampArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StampArchive for MemoryStampArchive {
    fn load(&self) -> Result<Vec<Stamp>, PersistenceError> {
        Ok(self.stamps.borrow().clone())
    }

    fn save(&self, stamps: &[Stamp]) -> Result<(), PersistenceError> {
        *self.stamps.borrow_mut() = stamps.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::{Color, StampShape, StampStore};
    use docstamp_viewer::DocPoint;

    fn sample_stamps() -> Vec<Stamp> {
        let mut store = StampStore::new();
        store.add(1, DocPoint::new(50.0, 50.0), StampShape::rectangle(), Color::RED, None);
        store.add(
            2,
            DocPoint::new(10.0, 20.0),
            StampShape::circle(),
            Color::BLUE,
            Some("APPROVED".to_owned()),
        );
        store.all().to_vec()
    }

    #[test]
    fn json_archive_round_trips_stamps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = JsonStampArchive::new(dir.path().join("stamps.json"));

        let stamps = sample_stamps();
        archive.save(&stamps).expect("save");

        let loaded = archive.load().expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id(), stamps[0].id());
        assert_eq!(loaded[1].text(), Some("APPROVED"));
        assert_eq!(loaded[1].page_index(), 2);
    }

    #[test]
    fn missing_archive_loads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = JsonStampArchive::new(dir.path().join("absent.json"));

        assert!(archive.load().expect("load").is_empty());
    }

    #[test]
    fn corrupt_archive_reports_deserialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stamps.json");
        fs::write(&path, b"not json").expect("write");

        let archive = JsonStampArchive::new(&path);
        assert!(matches!(archive.load(), Err(PersistenceError::Deserialization(_))));
    }

    #[test]
    fn memory_archive_round_trips_stamps() {
        let archive = MemoryStampArchive::new();
        let stamps = sample_stamps();

        archive.save(&stamps).expect("save");
        let loaded = archive.load().expect("load");
        assert_eq!(loaded.len(), stamps.len());
    }
}
