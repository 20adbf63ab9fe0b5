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

//! GPX track overlay data.
//!
//! GPX parsing itself is done by the `gpx` crate; this module flattens the
//! result into drawable segments with cumulative distance along the track.

mod profile;

pub use profile::{ElevationProfile, ProfilePoint};

use std::io::Read;

use log::{debug, info};
use thiserror::Error;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Errors that can occur while loading a track or profile.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("invalid GPX: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("invalid elevation series: {0}")]
    Series(#[from] serde_json::Error),

    #[error("track has no points")]
    Empty,
}

/// Great-circle distance between two points in metres.
#[must_use]
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// A single point along the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub lon: f64,
    pub lat: f64,
    /// Elevation in metres, when the GPX file has it.
    pub elevation: Option<f64>,
    /// Distance along the whole track up to this point, in metres.
    pub distance_m: f64,
}

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Centre of the box as `(lon, lat)`.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

/// A GPX track flattened into segments.
///
/// Distance keeps accumulating across segment breaks (measured point to
/// point), so a profile over the whole track reads continuously.
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub name: Option<String>,
    segments: Vec<Vec<TrackPoint>>,
}

impl Track {
    /// Build a track from raw `(lon, lat, elevation)` segments.
    #[must_use]
    pub fn from_segments(name: Option<String>, raw: Vec<Vec<(f64, f64, Option<f64>)>>) -> Self {
        let mut distance_m = 0.0;
        let mut last: Option<(f64, f64)> = None;
        let mut segments = Vec::with_capacity(raw.len());

        for raw_segment in raw {
            let mut segment = Vec::with_capacity(raw_segment.len());
            for (lon, lat, elevation) in raw_segment {
                if let Some((last_lon, last_lat)) = last {
                    distance_m += haversine_distance_m(last_lat, last_lon, lat, lon);
                }
                last = Some((lon, lat));
                segment.push(TrackPoint {
                    lon,
                    lat,
                    elevation,
                    distance_m,
                });
            }
            if !segment.is_empty() {
                segments.push(segment);
            }
        }

        Self { name, segments }
    }

    /// Read a GPX document. Track segments are used when present; a file
    /// with only routes falls back to the route points.
    pub fn from_gpx<R: Read>(reader: R) -> Result<Self, TrackError> {
        let gpx = gpx::read(reader)?;

        let mut name = None;
        let mut raw: Vec<Vec<(f64, f64, Option<f64>)>> = Vec::new();

        for track in &gpx.tracks {
            if name.is_none() {
                name.clone_from(&track.name);
            }
            for segment in &track.segments {
                raw.push(
                    segment
                        .points
                        .iter()
                        .map(|p| (p.point().x(), p.point().y(), p.elevation))
                        .collect(),
                );
            }
        }

        if raw.iter().all(Vec::is_empty) {
            debug!("GPX has no track points, trying routes");
            raw.clear();
            for route in &gpx.routes {
                if name.is_none() {
                    name.clone_from(&route.name);
                }
                raw.push(
                    route
                        .points
                        .iter()
                        .map(|p| (p.point().x(), p.point().y(), p.elevation))
                        .collect(),
                );
            }
        }

        let track = Self::from_segments(name, raw);
        if track.is_empty() {
            return Err(TrackError::Empty);
        }

        info!(
            "Loaded track {:?}: {} points, {:.1} km",
            track.name,
            track.len(),
            track.total_distance_m() / 1000.0
        );
        Ok(track)
    }

    #[must_use]
    pub fn segments(&self) -> &[Vec<TrackPoint>] {
        &self.segments
    }

    pub fn points(&self) -> impl Iterator<Item = &TrackPoint> {
        self.segments.iter().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn total_distance_m(&self) -> f64 {
        self.points().last().map_or(0.0, |p| p.distance_m)
    }

    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self.points();
        let first = points.next()?;
        let init = Bounds {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        Some(points.fold(init, |b, p| Bounds {
            min_lon: b.min_lon.min(p.lon),
            min_lat: b.min_lat.min(p.lat),
            max_lon: b.max_lon.max(p.lon),
            max_lat: b.max_lat.max(p.lat),
        }))
    }

    /// Track point closest to `(lon, lat)`.
    #[must_use]
    pub fn nearest_point(&self, lon: f64, lat: f64) -> Option<&TrackPoint> {
        self.points().min_by(|a, b| {
            let da = haversine_distance_m(lat, lon, a.lat, a.lon);
            let db = haversine_distance_m(lat, lon, b.lat, b.lon);
            da.total_cmp(&db)
        })
    }

    /// Elevation profile over the points that carry an elevation.
    #[must_use]
    pub fn elevation_profile(&self) -> ElevationProfile {
        ElevationProfile::from_track(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Mourne Wall</name>
    <trkseg>
      <trkpt lat="54.1800" lon="-5.9200"><ele>120.0</ele></trkpt>
      <trkpt lat="54.1810" lon="-5.9210"><ele>135.5</ele></trkpt>
      <trkpt lat="54.1820" lon="-5.9220"><ele>150.0</ele></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="54.1900" lon="-5.9300"><ele>300.0</ele></trkpt>
      <trkpt lat="54.1910" lon="-5.9310"/>
    </trkseg>
  </trk>
</gpx>"#;

    const ROUTE_ONLY_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <rte>
    <name>Planned</name>
    <rtept lat="54.0" lon="-6.0"/>
    <rtept lat="54.1" lon="-6.1"/>
  </rte>
</gpx>"#;

    #[test]
    fn test_haversine_distance() {
        // One degree of longitude at the equator is about 111.2 km
        let d = haversine_distance_m(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 50.0);
    }

    #[test]
    fn test_from_gpx() {
        let track = Track::from_gpx(GPX.as_bytes()).unwrap();
        assert_eq!(track.name.as_deref(), Some("Mourne Wall"));
        assert_eq!(track.segments().len(), 2);
        assert_eq!(track.len(), 5);

        let first = track.points().next().unwrap();
        assert!((first.lon - (-5.92)).abs() < 1e-9);
        assert!((first.lat - 54.18).abs() < 1e-9);
        assert_eq!(first.elevation, Some(120.0));
        assert_eq!(first.distance_m, 0.0);
    }

    #[test]
    fn test_distance_is_monotonic_across_segments() {
        let track = Track::from_gpx(GPX.as_bytes()).unwrap();
        let distances: Vec<f64> = track.points().map(|p| p.distance_m).collect();
        assert!(distances.windows(2).all(|w| w[1] > w[0]));
        assert!((track.total_distance_m() - distances[4]).abs() < 1e-9);
    }

    #[test]
    fn test_route_only_gpx() {
        let track = Track::from_gpx(ROUTE_ONLY_GPX.as_bytes()).unwrap();
        assert_eq!(track.name.as_deref(), Some("Planned"));
        assert_eq!(track.len(), 2);
    }

    #[test]
    fn test_empty_gpx() {
        let xml = r#"<?xml version="1.0"?><gpx version="1.1" creator="t" xmlns="http://www.topografix.com/GPX/1/1"></gpx>"#;
        assert!(matches!(Track::from_gpx(xml.as_bytes()), Err(TrackError::Empty)));
    }

    #[test]
    fn test_bounds() {
        let track = Track::from_gpx(GPX.as_bytes()).unwrap();
        let b = track.bounds().unwrap();
        assert!((b.min_lon - (-5.931)).abs() < 1e-9);
        assert!((b.max_lon - (-5.92)).abs() < 1e-9);
        assert!((b.min_lat - 54.18).abs() < 1e-9);
        assert!((b.max_lat - 54.191).abs() < 1e-9);
        assert!(Track::default().bounds().is_none());
    }

    #[test]
    fn test_nearest_point() {
        let track = Track::from_gpx(GPX.as_bytes()).unwrap();
        let p = track.nearest_point(-5.9299, 54.1899).unwrap();
        assert_eq!(p.elevation, Some(300.0));
    }
}
