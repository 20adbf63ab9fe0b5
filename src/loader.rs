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

//! Background loading of route documents, GPX tracks and profiles.
//!
//! A load runs on its own thread and parks the result in a shared slot the
//! UI polls each frame, the same way map tiles are handed over.

use eframe::egui;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where a document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Path(PathBuf),
}

impl Source {
    /// `http://` and `https://` references are URLs, anything else is a path
    pub fn parse(reference: &str) -> Self {
        let trimmed = reference.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Source::Url(trimmed.to_string())
        } else {
            Source::Path(PathBuf::from(trimmed))
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Read all bytes of a source. Blocks; call from a worker thread.
pub fn fetch_bytes(source: &Source) -> Result<Vec<u8>, BoxError> {
    match source {
        Source::Url(url) => {
            log::info!("Downloading {}", url);
            let response = reqwest::blocking::get(url)?;

            if !response.status().is_success() {
                return Err(format!("HTTP error: {}", response.status()).into());
            }

            Ok(response.bytes()?.to_vec())
        }
        Source::Path(path) => {
            log::info!("Reading {}", path.display());
            Ok(fs::read(path)?)
        }
    }
}

/// State of one background load
#[derive(Debug)]
pub enum LoadState<T> {
    Loading,
    Loaded(T),
    Failed(String),
    /// The result has been handed to the UI
    Taken,
}

/// Handle to a background load
pub struct Load<T> {
    pub source: Source,
    state: Arc<Mutex<LoadState<T>>>,
}

impl<T: Send + 'static> Load<T> {
    /// Fetch `source` on a worker thread and run `parse` over the bytes.
    pub fn spawn<F>(source: Source, ctx: &egui::Context, parse: F) -> Self
    where
        F: FnOnce(&[u8]) -> Result<T, BoxError> + Send + 'static,
    {
        let state = Arc::new(Mutex::new(LoadState::Loading));

        let state_clone = state.clone();
        let source_clone = source.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = fetch_bytes(&source_clone).and_then(|bytes| parse(&bytes));
            let next = match result {
                Ok(value) => LoadState::Loaded(value),
                Err(e) => {
                    log::error!("Failed to load {}: {}", source_clone, e);
                    LoadState::Failed(e.to_string())
                }
            };
            *state_clone.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = next;
            ctx.request_repaint();
        });

        Self { source, state }
    }

    /// Take the finished result, if any. A taken load reports `None` forever.
    pub fn take(&mut self) -> Option<Result<T, String>> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match std::mem::replace(&mut *state, LoadState::Taken) {
            LoadState::Loading => {
                *state = LoadState::Loading;
                None
            }
            LoadState::Loaded(value) => Some(Ok(value)),
            LoadState::Failed(message) => Some(Err(message)),
            LoadState::Taken => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
            LoadState::Loading
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!(
            Source::parse("https://example.org/route.xml"),
            Source::Url("https://example.org/route.xml".to_string())
        );
        assert_eq!(
            Source::parse(" http://example.org/a.gpx "),
            Source::Url("http://example.org/a.gpx".to_string())
        );
        assert_eq!(
            Source::parse("tracks/mourne.gpx"),
            Source::Path(PathBuf::from("tracks/mourne.gpx"))
        );
    }

    #[test]
    fn test_fetch_missing_file() {
        let source = Source::Path(PathBuf::from("/definitely/not/here.gpx"));
        assert!(fetch_bytes(&source).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "hello").unwrap();

        let ctx = egui::Context::default();
        let mut load = Load::spawn(Source::Path(path), &ctx, |bytes| {
            Ok(String::from_utf8(bytes.to_vec())?)
        });

        let mut result = None;
        for _ in 0..200 {
            result = load.take();
            if result.is_some() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert_eq!(result, Some(Ok("hello".to_string())));
        assert!(load.take().is_none());
        assert!(!load.is_loading());
    }
}
