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

//! Map rendering: base layers, overlay plugins and marker icons.
//!
//! Also converts between the stored [`Viewport`] and walkers' `MapMemory`.

pub mod icons;
pub mod layers;
pub mod plugins;

pub use icons::IconCache;
pub use layers::{BaseLayer, BaseTiles};
pub use plugins::{MapClick, MapEvents, MarkersPlugin, SharedMapEvents, TrackPlugin};

use route_core::track::Bounds;
use route_core::viewport::MAX_ZOOM;
use route_core::Viewport;
use walkers::{MapMemory, Position};

/// Tile edge in pixels
const TILE_SIZE: f64 = 256.0;

/// Centre of a viewport as a walkers position
pub fn position(viewport: &Viewport) -> Position {
    walkers::lon_lat(viewport.lon, viewport.lat)
}

/// Centre the map memory on a viewport
pub fn apply_viewport(memory: &mut MapMemory, viewport: &Viewport) {
    memory.center_at(position(viewport));
    if let Err(e) = memory.set_zoom(f64::from(viewport.zoom)) {
        log::warn!("Cannot set zoom {}: {:?}", viewport.zoom, e);
    }
}

/// Read the current viewport back out of the map memory.
///
/// `fallback` is the centre used while the map still follows its initial
/// position.
pub fn current_viewport(memory: &MapMemory, fallback: Position) -> Viewport {
    let center = memory.detached().unwrap_or(fallback);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "zoom is clamped to 0..=MAX_ZOOM"
    )]
    let zoom = memory.zoom().round().clamp(0.0, f64::from(MAX_ZOOM)) as u8;
    Viewport::new(center.x(), center.y(), zoom).clamped()
}

/// One step of the zoom buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStep {
    In,
    Out,
}

/// Zoom the map one level. Steps past the zoom limits are ignored.
pub fn step_zoom(memory: &mut MapMemory, step: ZoomStep) {
    let result = match step {
        ZoomStep::In => memory.zoom_in(),
        ZoomStep::Out => memory.zoom_out(),
    };
    if let Err(e) = result {
        log::debug!("Zoom {:?} ignored: {:?}", step, e);
    }
}

/// Web Mercator y as a fraction of the world height (0 at the top)
fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-85.051_128_78, 85.051_128_78).to_radians();
    (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0
}

/// Largest whole zoom at which `bounds` fits in a `width` x `height` pixel map
pub fn fit_zoom(bounds: &Bounds, width: f32, height: f32) -> u8 {
    let lon_span = ((bounds.max_lon - bounds.min_lon) / 360.0).abs();
    let lat_span = (mercator_y(bounds.min_lat) - mercator_y(bounds.max_lat)).abs();

    let zoom_for = |pixels: f32, span: f64| {
        if span <= f64::EPSILON {
            f64::from(MAX_ZOOM)
        } else {
            (f64::from(pixels) / (TILE_SIZE * span)).log2()
        }
    };

    let zoom = zoom_for(width, lon_span).min(zoom_for(height, lat_span));
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "zoom is clamped to 0..=MAX_ZOOM"
    )]
    let zoom = zoom.floor().clamp(0.0, f64::from(MAX_ZOOM)) as u8;
    zoom
}

/// Viewport centred on `bounds` and zoomed to fit them
pub fn fit_viewport(bounds: &Bounds, width: f32, height: f32) -> Viewport {
    let (lon, lat) = bounds.center();
    Viewport::new(lon, lat, fit_zoom(bounds, width, height))
}
