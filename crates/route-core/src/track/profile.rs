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

//! Elevation profile series for the chart.

use std::io::Read;

use serde::{Deserialize, Serialize};

use super::{Track, TrackError};

/// One chart point. `x`/`y` are the series keys used by exported route
/// pages, `lon`/`lat` tie the point back to the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    #[serde(rename = "x")]
    pub distance_km: f64,
    #[serde(rename = "y")]
    pub elevation_m: f64,
    pub lon: f64,
    pub lat: f64,
}

/// Elevation against distance, sorted by distance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElevationProfile {
    points: Vec<ProfilePoint>,
}

impl ElevationProfile {
    /// Build from arbitrary points; they are sorted by distance and
    /// non-finite values are dropped.
    #[must_use]
    pub fn new(mut points: Vec<ProfilePoint>) -> Self {
        points.retain(|p| {
            p.distance_km.is_finite()
                && p.elevation_m.is_finite()
                && p.lon.is_finite()
                && p.lat.is_finite()
        });
        points.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Self { points }
    }

    /// Profile over the track points that have an elevation.
    #[must_use]
    pub fn from_track(track: &Track) -> Self {
        Self::new(
            track
                .points()
                .filter_map(|p| {
                    p.elevation.map(|elevation_m| ProfilePoint {
                        distance_km: p.distance_m / 1000.0,
                        elevation_m,
                        lon: p.lon,
                        lat: p.lat,
                    })
                })
                .collect(),
        )
    }

    /// Read a JSON array of `{"x", "y", "lon", "lat"}` objects.
    pub fn from_json<R: Read>(reader: R) -> Result<Self, TrackError> {
        let points: Vec<ProfilePoint> = serde_json::from_reader(reader)?;
        Ok(Self::new(points))
    }

    #[must_use]
    pub fn points(&self) -> &[ProfilePoint] {
        &self.points
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// `(min, max)` elevation.
    #[must_use]
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        let first = self.points.first()?.elevation_m;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (lo.min(p.elevation_m), hi.max(p.elevation_m))
        }))
    }

    /// Total climb: sum of all positive elevation steps.
    #[must_use]
    pub fn total_ascent_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].elevation_m - w[0].elevation_m).max(0.0))
            .sum()
    }

    /// Point whose distance is closest to `distance_km`.
    #[must_use]
    pub fn nearest(&self, distance_km: f64) -> Option<&ProfilePoint> {
        if self.points.is_empty() || !distance_km.is_finite() {
            return None;
        }

        let idx = self
            .points
            .partition_point(|p| p.distance_km < distance_km);

        match (idx.checked_sub(1), self.points.get(idx)) {
            (Some(before), Some(after)) => {
                let before = &self.points[before];
                if distance_km - before.distance_km <= after.distance_km - distance_km {
                    Some(before)
                } else {
                    Some(after)
                }
            }
            (Some(before), None) => Some(&self.points[before]),
            (None, after) => after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(distance_km: f64, elevation_m: f64) -> ProfilePoint {
        ProfilePoint {
            distance_km,
            elevation_m,
            lon: -5.0 - distance_km / 100.0,
            lat: 54.0,
        }
    }

    #[test]
    fn test_from_track_skips_points_without_elevation() {
        let track = Track::from_segments(
            None,
            vec![vec![
                (-5.0, 54.0, Some(10.0)),
                (-5.01, 54.0, None),
                (-5.02, 54.0, Some(30.0)),
            ]],
        );
        let profile = ElevationProfile::from_track(&track);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile.points()[0].distance_km, 0.0);
        assert!(profile.points()[1].distance_km > 1.0);
        assert_eq!(profile.points()[1].elevation_m, 30.0);
    }

    #[test]
    fn test_from_json_series() {
        let json = r#"[
            {"x": 2.0, "y": 140.0, "lon": -5.92, "lat": 54.18},
            {"x": 0.0, "y": 100.0, "lon": -5.90, "lat": 54.17},
            {"x": 1.0, "y": 120.5, "lon": -5.91, "lat": 54.175}
        ]"#;
        let profile = ElevationProfile::from_json(json.as_bytes()).unwrap();
        let xs: Vec<f64> = profile.points().iter().map(|p| p.distance_km).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
        assert_eq!(profile.points()[1].elevation_m, 120.5);
    }

    #[test]
    fn test_from_json_invalid() {
        let result = ElevationProfile::from_json(r#"{"x": 1}"#.as_bytes());
        assert!(matches!(result, Err(TrackError::Series(_))));
    }

    #[test]
    fn test_nearest() {
        let profile = ElevationProfile::new(vec![point(0.0, 10.0), point(1.0, 20.0), point(3.0, 40.0)]);

        assert_eq!(profile.nearest(-1.0).unwrap().elevation_m, 10.0);
        assert_eq!(profile.nearest(0.4).unwrap().elevation_m, 10.0);
        assert_eq!(profile.nearest(0.6).unwrap().elevation_m, 20.0);
        assert_eq!(profile.nearest(1.9).unwrap().elevation_m, 20.0);
        assert_eq!(profile.nearest(2.1).unwrap().elevation_m, 40.0);
        assert_eq!(profile.nearest(10.0).unwrap().elevation_m, 40.0);
        assert!(profile.nearest(f64::NAN).is_none());
        assert!(ElevationProfile::default().nearest(1.0).is_none());
    }

    #[test]
    fn test_range_and_ascent() {
        let profile = ElevationProfile::new(vec![
            point(0.0, 100.0),
            point(1.0, 150.0),
            point(2.0, 120.0),
            point(3.0, 200.0),
        ]);
        assert_eq!(profile.elevation_range(), Some((100.0, 200.0)));
        assert!((profile.total_ascent_m() - 130.0).abs() < 1e-9);
    }
}
