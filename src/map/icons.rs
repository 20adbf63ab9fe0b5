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

//! Marker icon texture cache and loading.
//!
//! Icons referenced by route documents are loaded in the background, turned
//! into egui textures, and cached on disk under SHA256-based filenames.
//! Each icon reference is fetched at most once per session; failures are
//! remembered so markers fall back to a drawn pin.

use eframe::egui;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::APP_NAME;
use crate::loader::{fetch_bytes, Source};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// On-disk cache for downloaded icon bytes
#[derive(Clone)]
struct IconDiskCache {
    cache_dir: Option<PathBuf>,
}

impl IconDiskCache {
    fn new() -> Self {
        let cache_dir = dirs::cache_dir().map(|dir| dir.join(APP_NAME).join("icons"));

        let cache_dir = cache_dir.and_then(|dir| match fs::create_dir_all(&dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                log::warn!("Icon cache disabled, cannot create {}: {}", dir.display(), e);
                None
            }
        });

        Self { cache_dir }
    }

    /// Get cache file path for a given URL
    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        Some(dir.join(cache_file_name(url)))
    }

    fn get(&self, url: &str) -> Option<Vec<u8>> {
        fs::read(self.cache_path(url)?).ok()
    }

    fn put(&self, url: &str, bytes: &[u8]) {
        if let Some(path) = self.cache_path(url) {
            if let Err(e) = fs::write(&path, bytes) {
                log::warn!("Failed to cache icon {}: {}", url, e);
            }
        }
    }
}

/// Use SHA256 hash of the URL as filename to avoid filesystem issues
fn cache_file_name(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    // Keep a short extension from the URL, ignoring any query string
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 4 && !ext.contains('/'))
        .unwrap_or("img");

    format!("{}.{}", hash, ext)
}

/// Manages loading marker icons into egui textures
pub struct IconCache {
    disk: IconDiskCache,
    textures: Arc<Mutex<HashMap<String, egui::TextureHandle>>>,
    loading: Arc<Mutex<HashSet<String>>>,
    failed: Arc<Mutex<HashSet<String>>>,
}

impl IconCache {
    pub fn new() -> Self {
        Self {
            disk: IconDiskCache::new(),
            textures: Arc::new(Mutex::new(HashMap::new())),
            loading: Arc::new(Mutex::new(HashSet::new())),
            failed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Get the texture for an icon reference, starting a load if needed.
    ///
    /// Returns `None` while loading or when the icon could not be loaded.
    pub fn get_or_load(&self, ctx: &egui::Context, href: &str) -> Option<egui::TextureHandle> {
        if let Some(texture) = lock(&self.textures).get(href) {
            return Some(texture.clone());
        }

        if lock(&self.failed).contains(href) {
            return None;
        }

        // Check if already loading
        if !lock(&self.loading).insert(href.to_string()) {
            return None;
        }

        let disk = self.disk.clone();
        let textures = self.textures.clone();
        let loading = self.loading.clone();
        let failed = self.failed.clone();
        let ctx = ctx.clone();
        let href = href.to_string();

        std::thread::spawn(move || {
            match load_icon_bytes(&disk, &href).and_then(|bytes| texture_from_bytes(&ctx, &href, &bytes)) {
                Ok(texture) => {
                    lock(&textures).insert(href.clone(), texture);
                    ctx.request_repaint();
                }
                Err(e) => {
                    log::warn!("Failed to load marker icon {}: {}", href, e);
                    lock(&failed).insert(href.clone());
                }
            }
            lock(&loading).remove(&href);
        });

        None
    }
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn load_icon_bytes(disk: &IconDiskCache, href: &str) -> Result<Vec<u8>, BoxError> {
    let source = Source::parse(href);
    if let Source::Url(url) = &source {
        if let Some(bytes) = disk.get(url) {
            return Ok(bytes);
        }
        let bytes = fetch_bytes(&source)?;
        disk.put(url, &bytes);
        return Ok(bytes);
    }
    fetch_bytes(&source)
}

fn texture_from_bytes(ctx: &egui::Context, href: &str, bytes: &[u8]) -> Result<egui::TextureHandle, BoxError> {
    let image = image::load_from_memory(bytes)?;
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());

    Ok(ctx.load_texture(
        format!("marker_icon_{}", href),
        color_image,
        egui::TextureOptions::LINEAR,
    ))
}
