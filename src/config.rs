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

//! Application configuration management.
//!
//! Preferences are stored in TOML through `confy`. The last map position is
//! not kept here; it lives in the local key-value store (see
//! `route_core::storage`) so it survives config resets.

use serde::{Deserialize, Serialize};

use crate::map::layers::BaseLayer;

/// Application name used for config, cache and storage directories
pub const APP_NAME: &str = "routemap";

/// Default icon for the start marker
pub const DEFAULT_START_MARKER_ICON: &str = "/img/mapMarkers/green_MarkerS.png";

/// Environment variable that overrides the configured Thunderforest key
pub const THUNDERFOREST_KEY_ENV: &str = "THUNDERFOREST_API_KEY";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Selected base layer
    #[serde(default)]
    pub base_layer: BaseLayer,

    /// Show the GPX track overlay
    #[serde(default = "default_true")]
    pub show_track: bool,

    /// Show the marker overlay
    #[serde(default = "default_true")]
    pub show_markers: bool,

    /// Show the elevation chart panel when a profile is loaded
    #[serde(default = "default_true")]
    pub show_elevation: bool,

    /// Elevation panel height in pixels
    #[serde(default = "default_elevation_panel_height")]
    pub elevation_panel_height: f32,

    /// Distance in pixels within which the pointer counts as over the track
    #[serde(default = "default_hover_tolerance")]
    pub hover_tolerance_px: f32,

    /// Icon for the start marker (URL or path)
    #[serde(default = "default_start_marker_icon")]
    pub start_marker_icon: String,

    /// Site that relative marker links and icons are resolved against
    #[serde(default)]
    pub site_base_url: Option<String>,

    /// Thunderforest API key for the cycle map (optional, env var takes precedence)
    #[serde(default)]
    pub thunderforest_api_key: Option<String>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_elevation_panel_height() -> f32 {
    180.0
}

fn default_hover_tolerance() -> f32 {
    6.0
}

fn default_start_marker_icon() -> String {
    DEFAULT_START_MARKER_ICON.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            base_layer: BaseLayer::default(),
            show_track: true,
            show_markers: true,
            show_elevation: true,
            elevation_panel_height: default_elevation_panel_height(),
            hover_tolerance_px: default_hover_tolerance(),
            start_marker_icon: default_start_marker_icon(),
            site_base_url: None,
            thunderforest_api_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "config")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, "config", self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, "config")
    }

    /// Resolve the Thunderforest key from the environment or config
    pub fn resolve_thunderforest_key(&self) -> Option<String> {
        resolve_api_key(
            std::env::var(THUNDERFOREST_KEY_ENV).ok().as_deref(),
            self.thunderforest_api_key.as_deref(),
        )
    }
}

/// Pick the first non-empty key, environment first
fn resolve_api_key(env_key: Option<&str>, config_key: Option<&str>) -> Option<String> {
    env_key
        .filter(|k| !k.is_empty())
        .or(config_key.filter(|k| !k.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: AppConfig = toml::from_str("show_track = false\n").unwrap();
        assert!(!config.show_track);
        assert!(config.show_markers);
        assert_eq!(config.base_layer, BaseLayer::Mapnik);
        assert_eq!(config.start_marker_icon, DEFAULT_START_MARKER_ICON);
        assert!((config.hover_tolerance_px - 6.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig {
            base_layer: BaseLayer::CycleMap,
            site_base_url: Some("https://example.org".to_string()),
            ..AppConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_resolve_api_key() {
        assert_eq!(resolve_api_key(Some("env"), Some("cfg")).as_deref(), Some("env"));
        assert_eq!(resolve_api_key(Some(""), Some("cfg")).as_deref(), Some("cfg"));
        assert_eq!(resolve_api_key(None, Some("")), None);
        assert_eq!(resolve_api_key(None, None), None);
    }
}
