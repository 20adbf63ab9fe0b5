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

//! Elevation profile chart.
//!
//! An area chart of elevation against distance. Hovering it reports the
//! nearest profile point so the map can mirror it with the cross-link marker.

use egui::Color32;
use egui_plot::{Line, Plot, PlotPoints};
use route_core::{ElevationProfile, ProfilePoint};

const TITLE: &str = "Elevation profile";
const SERIES_NAME: &str = "elevation";
const X_LABEL: &str = "Distance";
const Y_LABEL: &str = "(m)";

const AREA_COLOR: Color32 = Color32::from_rgb(70, 130, 180);

/// Chart panel for one elevation profile
#[derive(Debug)]
pub struct ElevationChart {
    profile: ElevationProfile,
    /// Base of the filled area, just under the lowest point
    floor_m: f64,
}

impl ElevationChart {
    pub fn new(profile: ElevationProfile) -> Self {
        let floor_m = profile
            .elevation_range()
            .map_or(0.0, |(min, _)| (min / 10.0).floor() * 10.0);
        Self { profile, floor_m }
    }

    /// Draw the chart. Returns the profile point under the pointer, if any.
    pub fn show(&self, ui: &mut egui::Ui) -> Option<ProfilePoint> {
        ui.horizontal(|ui| {
            ui.strong(TITLE);
            if let Some((min, max)) = self.profile.elevation_range() {
                ui.separator();
                ui.weak(format!(
                    "{:.0} to {:.0} m, ascent {:.0} m",
                    min,
                    max,
                    self.profile.total_ascent_m()
                ));
            }
        });

        let points: PlotPoints = self
            .profile
            .points()
            .iter()
            .map(|p| [p.distance_km, p.elevation_m])
            .collect();

        let response = Plot::new("elevation_profile")
            .x_axis_label(X_LABEL)
            .y_axis_label(Y_LABEL)
            .x_axis_formatter(|mark, _range| format!("{:.1} km", mark.value))
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(SERIES_NAME, points)
                        .color(AREA_COLOR)
                        .fill(self.floor_m as f32),
                );
                plot_ui.pointer_coordinate()
            });

        if !response.response.hovered() {
            return None;
        }

        let pointer = response.inner?;
        self.profile.nearest(pointer.x).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ElevationProfile {
        ElevationProfile::new(vec![
            ProfilePoint {
                distance_km: 0.0,
                elevation_m: 123.0,
                lon: -5.9,
                lat: 54.2,
            },
            ProfilePoint {
                distance_km: 1.0,
                elevation_m: 340.0,
                lon: -5.91,
                lat: 54.19,
            },
        ])
    }

    #[test]
    fn test_floor_is_under_lowest_point() {
        let chart = ElevationChart::new(profile());
        assert!((chart.floor_m - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_profile_floor() {
        let chart = ElevationChart::new(ElevationProfile::new(Vec::new()));
        assert!(chart.floor_m.abs() < f64::EPSILON);
        assert!(chart.profile.is_empty());
    }
}
