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

//! Map viewport: centre coordinate and zoom level.

use serde::{Deserialize, Serialize};

/// Highest zoom level offered by the base layers.
pub const MAX_ZOOM: u8 = 19;

/// Web Mercator latitude limit in degrees.
const MAX_LATITUDE: f64 = 85.051_128_78;

/// The map's centre (EPSG:4326 degrees) and integer zoom level.
///
/// Serializes to `{"lon": .., "lat": .., "zoom": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub lon: f64,
    pub lat: f64,
    pub zoom: u8,
}

impl Viewport {
    /// Start position used when nothing has been remembered yet.
    pub const DEFAULT: Viewport = Viewport {
        lon: -5.208,
        lat: 54.387,
        zoom: 5,
    };

    #[must_use]
    pub const fn new(lon: f64, lat: f64, zoom: u8) -> Self {
        Self { lon, lat, zoom }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Bring the viewport back inside what the map can display: latitude
    /// clamped to the Mercator limit, longitude wrapped to [-180, 180] and
    /// zoom capped at [`MAX_ZOOM`].
    #[must_use]
    pub fn clamped(&self) -> Self {
        let mut lon = (self.lon + 180.0).rem_euclid(360.0) - 180.0;
        // rem_euclid maps +180 to -180; keep the caller's +180
        if (self.lon - 180.0).abs() < f64::EPSILON {
            lon = 180.0;
        }

        Self {
            lon,
            lat: self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            zoom: self.zoom.min(MAX_ZOOM),
        }
    }

    /// Whether two viewports differ enough to be worth remembering again.
    #[must_use]
    pub fn differs_from(&self, other: &Viewport) -> bool {
        const EPSILON: f64 = 1e-7;
        self.zoom != other.zoom
            || (self.lon - other.lon).abs() > EPSILON
            || (self.lat - other.lat).abs() > EPSILON
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport() {
        let vp = Viewport::default();
        assert_eq!(vp.lon, -5.208);
        assert_eq!(vp.lat, 54.387);
        assert_eq!(vp.zoom, 5);
    }

    #[test]
    fn test_json_field_names() {
        let json = Viewport::new(1.5, -2.25, 9).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["lon"], 1.5);
        assert_eq!(value["lat"], -2.25);
        assert_eq!(value["zoom"], 9);
    }

    #[test]
    fn test_from_browser_json() {
        let vp = Viewport::from_json(r#"{"lon":-5.93,"lat":54.59,"zoom":13}"#).unwrap();
        assert_eq!(vp, Viewport::new(-5.93, 54.59, 13));
    }

    #[test]
    fn test_from_json_rejects_fractional_zoom() {
        assert!(Viewport::from_json(r#"{"lon":0,"lat":0,"zoom":3.5}"#).is_err());
    }

    #[test]
    fn test_clamped() {
        let vp = Viewport::new(190.0, 89.0, 25).clamped();
        assert!((vp.lon - (-170.0)).abs() < 1e-9);
        assert!((vp.lat - MAX_LATITUDE).abs() < 1e-9);
        assert_eq!(vp.zoom, MAX_ZOOM);

        let edge = Viewport::new(180.0, 0.0, 3).clamped();
        assert_eq!(edge.lon, 180.0);
    }

    #[test]
    fn test_differs_from() {
        let a = Viewport::new(1.0, 2.0, 5);
        assert!(!a.differs_from(&Viewport::new(1.0, 2.0, 5)));
        assert!(a.differs_from(&Viewport::new(1.0, 2.0, 6)));
        assert!(a.differs_from(&Viewport::new(1.001, 2.0, 5)));
    }
}
