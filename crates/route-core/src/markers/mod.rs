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

//! Marker layer state.
//!
//! Holds the place markers loaded from a route document plus two singletons:
//! the start marker dropped by clicking the map, and the cross-link point
//! that mirrors whatever is hovered in the elevation chart or on the track.
//! Drawing is left to the UI; this module decides what exists, in which
//! stacking order, and what a click selects.

use log::debug;

use crate::route::{MarkerKind, PlaceMarker};

/// Link carried by the start marker. Not a navigation target.
pub const START_LINK: &str = "Start";

/// Handle to a marker in a [`MarkerLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(u64);

/// Outcome of clicking on the marker layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A marker with a link was clicked; go there.
    Navigate(String),
    /// A marker without a navigable link was clicked.
    Selected(MarkerId),
    /// The click missed every marker and cleared the selection.
    Cleared,
}

#[derive(Debug, Clone)]
struct Entry {
    id: MarkerId,
    marker: PlaceMarker,
}

/// Place markers plus the single start marker and single cross-link point.
#[derive(Debug, Clone)]
pub struct MarkerLayer {
    entries: Vec<Entry>,
    next_id: u64,
    start: Option<MarkerId>,
    crosslink: Option<(f64, f64)>,
    selected: Option<MarkerId>,
    start_icon: String,
}

impl MarkerLayer {
    /// Create an empty layer. `start_icon` is the icon used for start markers.
    #[must_use]
    pub fn new(start_icon: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            start: None,
            crosslink: None,
            selected: None,
            start_icon: start_icon.into(),
        }
    }

    /// Add a marker and return its handle.
    pub fn add_place_marker(&mut self, marker: PlaceMarker) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, marker });
        id
    }

    /// Add every marker from a route document.
    pub fn extend(&mut self, markers: impl IntoIterator<Item = PlaceMarker>) {
        for marker in markers {
            self.add_place_marker(marker);
        }
    }

    /// Remove a marker. Returns it if it existed.
    pub fn remove(&mut self, id: MarkerId) -> Option<PlaceMarker> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        if self.start == Some(id) {
            self.start = None;
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(self.entries.remove(pos).marker)
    }

    /// Drop every route marker, keeping the start marker and cross-link point.
    pub fn clear_route_markers(&mut self) {
        let start = self.start;
        self.entries.retain(|e| Some(e.id) == start);
        if self.selected != start {
            self.selected = None;
        }
    }

    /// Drop the start marker at `(lon, lat)`, replacing any earlier one.
    pub fn place_start_marker(&mut self, lon: f64, lat: f64) -> MarkerId {
        if let Some(previous) = self.start.take() {
            self.remove(previous);
        }

        let marker = PlaceMarker::new(MarkerKind::Start, lon, lat)
            .with_icon(self.start_icon.clone())
            .with_link(START_LINK);
        let id = self.add_place_marker(marker);
        self.start = Some(id);
        debug!("Start marker at {lon:.5}, {lat:.5}");
        id
    }

    #[must_use]
    pub fn start_marker(&self) -> Option<&PlaceMarker> {
        self.start.and_then(|id| self.get(id))
    }

    /// Move the single cross-link point to `(lon, lat)`.
    pub fn move_crosslink_marker(&mut self, lon: f64, lat: f64) {
        self.crosslink = Some((lon, lat));
    }

    /// Current cross-link point as `(lon, lat)`.
    #[must_use]
    pub fn crosslink(&self) -> Option<(f64, f64)> {
        self.crosslink
    }

    pub fn clear_crosslink(&mut self) {
        self.crosslink = None;
    }

    #[must_use]
    pub fn get(&self, id: MarkerId) -> Option<&PlaceMarker> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.marker)
    }

    #[must_use]
    pub fn selected(&self) -> Option<MarkerId> {
        self.selected
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Markers in drawing order: by z-index, then insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &PlaceMarker)> {
        let mut ordered: Vec<&Entry> = self.entries.iter().collect();
        ordered.sort_by_key(|e| e.marker.z_index());
        ordered.into_iter().map(|e| (e.id, &e.marker))
    }

    /// Top-most marker whose icon contains `pointer`.
    ///
    /// `project` maps a marker to the screen position of its coordinate;
    /// icons hang above that point (see [`crate::IconSize::anchor_offset`]).
    pub fn hit_test<F>(&self, pointer: (f32, f32), project: F) -> Option<MarkerId>
    where
        F: Fn(&PlaceMarker) -> (f32, f32),
    {
        let drawn: Vec<_> = self.iter().collect();
        drawn.into_iter().rev().find_map(|(id, marker)| {
            let (x, y) = project(marker);
            let (dx, dy) = marker.icon_size().anchor_offset();
            let size = marker.icon_size();
            let left = x + dx;
            let top = y + dy;
            #[allow(clippy::cast_precision_loss, reason = "icon sizes are small")]
            let (right, bottom) = (left + size.width as f32, top + size.height as f32);

            let inside = pointer.0 >= left && pointer.0 <= right && pointer.1 >= top && pointer.1 <= bottom;
            inside.then_some(id)
        })
    }

    /// Apply a click: select the clicked marker (or clear the selection when
    /// nothing was hit) and say whether to navigate.
    pub fn click(&mut self, hit: Option<MarkerId>) -> Selection {
        let Some((id, marker)) = hit.and_then(|id| self.get(id).map(|m| (id, m))) else {
            self.selected = None;
            return Selection::Cleared;
        };

        let navigate = match (marker.kind, &marker.link) {
            (MarkerKind::Start, _) | (_, None) => None,
            (_, Some(link)) if link.is_empty() => None,
            (_, Some(link)) => Some(link.clone()),
        };

        self.selected = Some(id);
        match navigate {
            Some(link) => Selection::Navigate(link),
            None => Selection::Selected(id),
        }
    }
}

impl Default for MarkerLayer {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// Resolve a link or icon reference from a route document against the
/// site it came from.
///
/// Absolute `http(s)://` references and references with no base are
/// returned unchanged.
#[must_use]
pub fn resolve_href(base: Option<&str>, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match base {
        Some(base) if !base.is_empty() => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            href.trim_start_matches('/')
        ),
        _ => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_with_route() -> (MarkerLayer, MarkerId, MarkerId) {
        let mut layer = MarkerLayer::new("/img/mapMarkers/green_MarkerS.png");
        let pic = layer.add_place_marker(
            PlaceMarker::new(MarkerKind::Pic, 0.0, 0.0)
                .with_link("/pics/1")
                .with_icon("/img/pic.png"),
        );
        let poi = layer.add_place_marker(
            PlaceMarker::new(MarkerKind::Poi, 100.0, 0.0)
                .with_link("/poi/1")
                .with_title("Cafe"),
        );
        (layer, pic, poi)
    }

    // One degree = one pixel, screen y grows downwards.
    #[allow(clippy::cast_possible_truncation, reason = "test projection")]
    fn project(m: &PlaceMarker) -> (f32, f32) {
        (m.lon as f32, -(m.lat as f32))
    }

    #[test]
    fn test_exactly_one_start_marker() {
        let (mut layer, _, _) = layer_with_route();

        layer.place_start_marker(1.0, 1.0);
        layer.place_start_marker(2.0, 2.0);
        let last = layer.place_start_marker(3.0, 3.0);

        let starts: Vec<_> = layer
            .iter()
            .filter(|(_, m)| m.kind == MarkerKind::Start)
            .collect();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].0, last);

        let start = layer.start_marker().unwrap();
        assert_eq!((start.lon, start.lat), (3.0, 3.0));
        assert_eq!(start.link.as_deref(), Some(START_LINK));
        assert_eq!(start.icon.as_deref(), Some("/img/mapMarkers/green_MarkerS.png"));
        assert_eq!(layer.len(), 3);
    }

    #[test]
    fn test_single_crosslink_point() {
        let mut layer = MarkerLayer::default();
        assert_eq!(layer.crosslink(), None);
        layer.move_crosslink_marker(1.0, 2.0);
        layer.move_crosslink_marker(3.0, 4.0);
        assert_eq!(layer.crosslink(), Some((3.0, 4.0)));
        assert!(layer.is_empty());
        layer.clear_crosslink();
        assert_eq!(layer.crosslink(), None);
    }

    #[test]
    fn test_start_marker_drawn_on_top() {
        let (mut layer, _, _) = layer_with_route();
        let start = layer.place_start_marker(5.0, 0.0);
        layer.add_place_marker(PlaceMarker::new(MarkerKind::Pic, 6.0, 0.0));

        let order: Vec<_> = layer.iter().map(|(id, _)| id).collect();
        assert_eq!(order.last(), Some(&start));
    }

    #[test]
    fn test_hit_test() {
        let (mut layer, pic, poi) = layer_with_route();

        // Pic icon is 20x34 hanging above (0, 0)
        assert_eq!(layer.hit_test((0.0, -10.0), project), Some(pic));
        assert_eq!(layer.hit_test((-9.0, -33.0), project), Some(pic));
        assert_eq!(layer.hit_test((0.0, 5.0), project), None);
        // Poi icon is 28x28 hanging above (100, 0)
        assert_eq!(layer.hit_test((112.0, -1.0), project), Some(poi));

        // Start marker overlapping the pic wins
        let start = layer.place_start_marker(1.0, 0.0);
        assert_eq!(layer.hit_test((0.0, -10.0), project), Some(start));
    }

    #[test]
    fn test_click_navigates_to_link() {
        let (mut layer, pic, _) = layer_with_route();
        assert_eq!(layer.click(Some(pic)), Selection::Navigate("/pics/1".to_string()));
        assert_eq!(layer.selected(), Some(pic));
    }

    #[test]
    fn test_click_start_marker_does_not_navigate() {
        let (mut layer, _, _) = layer_with_route();
        let start = layer.place_start_marker(1.0, 1.0);
        assert_eq!(layer.click(Some(start)), Selection::Selected(start));
    }

    #[test]
    fn test_clickout_clears_selection() {
        let (mut layer, pic, _) = layer_with_route();
        layer.click(Some(pic));
        assert_eq!(layer.click(None), Selection::Cleared);
        assert_eq!(layer.selected(), None);
    }

    #[test]
    fn test_clear_route_markers_keeps_start() {
        let (mut layer, _, _) = layer_with_route();
        layer.place_start_marker(1.0, 1.0);
        layer.move_crosslink_marker(2.0, 2.0);
        layer.clear_route_markers();

        assert_eq!(layer.len(), 1);
        assert!(layer.start_marker().is_some());
        assert_eq!(layer.crosslink(), Some((2.0, 2.0)));
    }

    #[test]
    fn test_remove_start_marker() {
        let mut layer = MarkerLayer::default();
        let start = layer.place_start_marker(1.0, 1.0);
        assert!(layer.remove(start).is_some());
        assert!(layer.start_marker().is_none());
        assert!(layer.remove(start).is_none());
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href(Some("https://example.org/"), "/pics/1"),
            "https://example.org/pics/1"
        );
        assert_eq!(
            resolve_href(Some("https://example.org"), "https://other.org/x"),
            "https://other.org/x"
        );
        assert_eq!(resolve_href(None, "/img/a.png"), "/img/a.png");
    }
}
