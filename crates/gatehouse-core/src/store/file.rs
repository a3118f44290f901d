use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{sanitize_origin, SessionStore, StorageError, StorageResult, StoreKey};

/// Storage file name inside an origin directory
const STORAGE_FILE: &str = "storage.json";

/// Extension an unparsable storage file is renamed to
const CORRUPT_EXTENSION: &str = "json.corrupt";

/// Session store backed by a JSON object file, one file per origin.
///
/// Layout: `<data_dir>/origins/<sanitized-origin>/storage.json`, holding
/// `{"user": "...", "accessToken": "..."}`. The file is removed once the
/// last record is cleared. A file that is not a JSON string map is moved
/// aside to `storage.json.corrupt` and the store starts over empty.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store scoped to `origin` under `data_dir`.
    pub fn for_origin(data_dir: &Path, origin: &str) -> Self {
        Self::new(
            data_dir
                .join("origins")
                .join(sanitize_origin(origin))
                .join(STORAGE_FILE),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&contents) {
            Ok(records) => Ok(records),
            Err(e) => {
                let moved_to = self.path.with_extension(CORRUPT_EXTENSION);
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    moved_to = %moved_to.display(),
                    "Session storage file is unreadable, starting over"
                );
                std::fs::rename(&self.path, &moved_to)?;
                Ok(BTreeMap::new())
            }
        }
    }

    /// Where an unreadable storage file was moved.
    pub fn corrupt_path(&self) -> PathBuf {
        self.path.with_extension(CORRUPT_EXTENSION)
    }

    fn persist(&self, records: &BTreeMap<String, String>) -> StorageResult<()> {
        if records.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(records)
            .map_err(|e| StorageError::Malformed(e.to_string()))?;

        // Temp file then rename, so readers see either the old map or the new one
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn read(&self, key: StoreKey) -> StorageResult<Option<String>> {
        Ok(self.load()?.remove(key.as_str()))
    }

    fn write(&mut self, key: StoreKey, value: &str) -> StorageResult<()> {
        let mut records = self.load()?;
        records.insert(key.as_str().to_string(), value.to_string());
        self.persist(&records)?;
        debug!(%key, path = %self.path.display(), "Stored session record");
        Ok(())
    }

    fn clear(&mut self, key: StoreKey) -> StorageResult<()> {
        let mut records = self.load()?;
        if records.remove(key.as_str()).is_some() {
            self.persist(&records)?;
            debug!(%key, path = %self.path.display(), "Cleared session record");
        }
        Ok(())
    }
}
