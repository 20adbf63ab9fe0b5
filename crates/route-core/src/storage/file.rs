// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! File-backed key-value store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::{KeyValueStore, StorageError};

const STORE_FILE_NAME: &str = "local_storage.json";

/// Key-value store kept as one JSON object on disk.
///
/// The whole file is rewritten on every `set`/`remove`; it only ever holds a
/// handful of small entries.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store in the platform data directory
    /// (`<data_dir>/<app_name>/local_storage.json`).
    pub fn open_default(app_name: &str) -> Result<Self, StorageError> {
        let dir = dirs::data_dir()
            .ok_or(StorageError::NoDataDir)?
            .join(app_name);
        Self::open(dir.as_path().join(STORE_FILE_NAME))
    }

    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// A file that is not a JSON object of strings is set aside as
    /// `<name>.bak` and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    let backup = path.with_extension("json.bak");
                    warn!(
                        "Local storage {} unreadable ({e}), moving it to {}",
                        path.display(),
                        backup.display()
                    );
                    fs::rename(&path, &backup)?;
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!("Using local storage at {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{remember_viewport, restore_viewport, VIEWPORT_KEY};
    use crate::viewport::Viewport;

    use tempfile::TempDir;

    #[test]
    fn test_viewport_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local_storage.json");
        let vp = Viewport::new(-6.25, 53.35, 11);

        {
            let mut store = FileStore::open(&path).unwrap();
            remember_viewport(&mut store, &vp).unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(restore_viewport(&store), vp);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("local_storage.json")).unwrap();
        assert_eq!(store.get(VIEWPORT_KEY).unwrap(), None);
        assert_eq!(restore_viewport(&store), Viewport::DEFAULT);
    }

    #[test]
    fn test_corrupt_file_is_set_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local_storage.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(VIEWPORT_KEY).unwrap(), None);
        assert!(path.with_extension("json.bak").exists());
    }

    #[test]
    fn test_remove_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local_storage.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("a", "1".to_string()).unwrap();
        store.set("b", "2".to_string()).unwrap();
        store.remove("a").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
    }
}
