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

//! Local key-value storage and viewport persistence.
//!
//! The store holds plain strings under string keys. The viewport is kept as
//! a JSON object under [`VIEWPORT_KEY`] and read back verbatim on the next
//! start.

mod file;

pub use file::FileStore;

use std::collections::HashMap;

use log::{debug, warn};
use thiserror::Error;

use crate::viewport::Viewport;

/// Key under which the last map viewport is stored.
pub const VIEWPORT_KEY: &str = "mapPosition";

/// Errors raised by a key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no data directory available on this platform")]
    NoDataDir,
}

/// A string-keyed store of string values.
pub trait KeyValueStore {
    /// Get the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store, used when persistence is disabled and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Save the viewport under [`VIEWPORT_KEY`].
pub fn remember_viewport<S>(store: &mut S, viewport: &Viewport) -> Result<(), StorageError>
where
    S: KeyValueStore + ?Sized,
{
    let json = viewport.to_json()?;
    debug!("Remembering map position {json}");
    store.set(VIEWPORT_KEY, json)
}

/// Load the last remembered viewport.
///
/// Falls back to [`Viewport::DEFAULT`] when nothing is stored, the store
/// cannot be read, or the stored value does not parse.
pub fn restore_viewport<S>(store: &S) -> Viewport
where
    S: KeyValueStore + ?Sized,
{
    match store.get(VIEWPORT_KEY) {
        Ok(Some(json)) => match Viewport::from_json(&json) {
            Ok(viewport) => viewport,
            Err(e) => {
                warn!("Ignoring unreadable stored map position {json:?}: {e}");
                Viewport::DEFAULT
            }
        },
        Ok(None) => Viewport::DEFAULT,
        Err(e) => {
            warn!("Failed to read stored map position: {e}");
            Viewport::DEFAULT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut store = MemoryStore::new();
        let vp = Viewport::new(-5.930_12, 54.597_3, 14);

        remember_viewport(&mut store, &vp).unwrap();
        assert_eq!(restore_viewport(&store), vp);
    }

    #[test]
    fn test_round_trip_full_precision() {
        let mut store = MemoryStore::new();
        // Coordinates read back from the map projector carry all 17 digits
        let viewports = [
            Viewport::new(-116.833_615_548_096_13, 15.315_243_423_012_66, 12),
            Viewport::new(0.1 + 0.2, -(1.0 / 3.0), 0),
            Viewport::new(179.999_999_999_999_97, -85.051_128_779_806_59, 19),
        ];

        for vp in viewports {
            remember_viewport(&mut store, &vp).unwrap();
            let back = restore_viewport(&store);
            assert_eq!(back.lon.to_bits(), vp.lon.to_bits());
            assert_eq!(back.lat.to_bits(), vp.lat.to_bits());
            assert_eq!(back.zoom, vp.zoom);
        }
    }

    #[test]
    fn test_missing_state_gives_default() {
        let store = MemoryStore::new();
        assert_eq!(restore_viewport(&store), Viewport::new(-5.208, 54.387, 5));
    }

    #[test]
    fn test_corrupt_state_gives_default() {
        let mut store = MemoryStore::new();
        store.set(VIEWPORT_KEY, "{not json".to_string()).unwrap();
        assert_eq!(restore_viewport(&store), Viewport::DEFAULT);
    }

    #[test]
    fn test_latest_viewport_wins() {
        let mut store = MemoryStore::new();
        remember_viewport(&mut store, &Viewport::new(1.0, 1.0, 3)).unwrap();
        remember_viewport(&mut store, &Viewport::new(2.0, 2.0, 4)).unwrap();
        assert_eq!(restore_viewport(&store), Viewport::new(2.0, 2.0, 4));
    }

    #[test]
    fn test_stored_value_is_json_object() {
        let mut store = MemoryStore::new();
        remember_viewport(&mut store, &Viewport::new(3.0, 4.0, 6)).unwrap();

        let raw = store.get(VIEWPORT_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.is_object());
        assert_eq!(value.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_remove() {
        let mut store = MemoryStore::new();
        remember_viewport(&mut store, &Viewport::new(3.0, 4.0, 6)).unwrap();
        store.remove(VIEWPORT_KEY).unwrap();
        store.remove(VIEWPORT_KEY).unwrap();
        assert_eq!(restore_viewport(&store), Viewport::DEFAULT);
    }
}
