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

//! Map overlays drawn as walkers plugins.
//!
//! Plugins run inside the map widget and only see the projector, so they
//! report what happened under the pointer through [`SharedMapEvents`]; the
//! app reads it back once the map has been shown.

use eframe::egui;
use route_core::{MarkerId, MarkerLayer, MarkerKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use walkers::{MapMemory, Plugin, Projector};

/// Track line: blue, 4px, half transparent
const TRACK_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 128, 128);
const TRACK_WIDTH: f32 = 4.0;
const TRACK_HIGHLIGHT_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 0, 255);

/// Cross-link point: yellow at 90% opacity with a black outline
const CROSSLINK_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(230, 230, 0, 230);
const CROSSLINK_RADIUS: f32 = 6.0;

/// A click on the map, already converted to map coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapClick {
    /// Marker under the pointer, if any
    pub marker: Option<MarkerId>,
    pub lon: f64,
    pub lat: f64,
}

/// What the plugins saw during the last frame
#[derive(Debug, Default, Clone)]
pub struct MapEvents {
    /// Pointer position over the map as `(lon, lat)`
    pub pointer: Option<(f64, f64)>,
    /// Pointer position when it is over the track
    pub track_hover: Option<(f64, f64)>,
    pub click: Option<MapClick>,
}

pub type SharedMapEvents = Arc<Mutex<MapEvents>>;

fn with_events(events: &SharedMapEvents, f: impl FnOnce(&mut MapEvents)) {
    let mut guard = events.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    f(&mut guard);
}

fn to_screen(projector: &Projector, lon: f64, lat: f64) -> egui::Pos2 {
    let v = projector.project(walkers::lon_lat(lon, lat));
    egui::pos2(v.x, v.y)
}

fn to_map(projector: &Projector, pos: egui::Pos2) -> (f64, f64) {
    let p = projector.unproject(pos.to_vec2());
    (p.x(), p.y())
}

/// Shortest distance from `p` to the segment `a`-`b`, in pixels
fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Whether `p` is within `tolerance` pixels of any polyline
fn near_polylines(p: egui::Pos2, polylines: &[Vec<egui::Pos2>], tolerance: f32) -> bool {
    polylines.iter().any(|line| match line.as_slice() {
        [single] => p.distance(*single) <= tolerance,
        points => points
            .windows(2)
            .any(|w| distance_to_segment(p, w[0], w[1]) <= tolerance),
    })
}

/// Draws the GPX track and reports when the pointer is over it
pub struct TrackPlugin {
    /// Segments as `(lon, lat)` points
    pub segments: Vec<Vec<(f64, f64)>>,
    pub hover_tolerance: f32,
    pub events: SharedMapEvents,
}

impl Plugin for TrackPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let painter = ui.painter().with_clip_rect(response.rect);

        let polylines: Vec<Vec<egui::Pos2>> = self
            .segments
            .iter()
            .map(|segment| {
                segment
                    .iter()
                    .map(|&(lon, lat)| to_screen(projector, lon, lat))
                    .collect()
            })
            .collect();

        let hover = response
            .hover_pos()
            .filter(|pos| near_polylines(*pos, &polylines, self.hover_tolerance));

        let stroke = if hover.is_some() {
            egui::Stroke::new(TRACK_WIDTH, TRACK_HIGHLIGHT_COLOR)
        } else {
            egui::Stroke::new(TRACK_WIDTH, TRACK_COLOR)
        };

        for line in polylines.into_iter().filter(|line| line.len() > 1) {
            painter.add(egui::Shape::line(line, stroke));
        }

        if let Some(pos) = hover {
            let lon_lat = to_map(projector, pos);
            with_events(&self.events, |events| events.track_hover = Some(lon_lat));
        }
    }
}

/// Draws place markers, the start marker and the cross-link point, and
/// reports clicks
pub struct MarkersPlugin {
    /// Snapshot of the markers to draw this frame
    pub layer: MarkerLayer,
    pub icons: HashMap<MarkerId, egui::TextureHandle>,
    pub events: SharedMapEvents,
}

impl MarkersPlugin {
    fn draw_pin(painter: &egui::Painter, rect: egui::Rect, kind: MarkerKind, selected: bool) {
        let fill = match kind {
            MarkerKind::Start => egui::Color32::from_rgb(40, 170, 60),
            MarkerKind::Pic => egui::Color32::from_rgb(220, 60, 50),
            MarkerKind::Poi => egui::Color32::from_rgb(50, 110, 220),
        };
        let outline = if selected {
            egui::Stroke::new(2.5, egui::Color32::YELLOW)
        } else {
            egui::Stroke::new(1.5, egui::Color32::WHITE)
        };

        let head_radius = rect.width() / 2.0;
        let head_center = egui::pos2(rect.center().x, rect.top() + head_radius);
        let tip = rect.center_bottom();

        painter.add(egui::Shape::convex_polygon(
            vec![
                head_center + egui::vec2(-head_radius * 0.6, head_radius * 0.5),
                tip,
                head_center + egui::vec2(head_radius * 0.6, head_radius * 0.5),
            ],
            fill,
            egui::Stroke::NONE,
        ));
        painter.circle(head_center, head_radius, fill, outline);
        painter.circle_filled(head_center, head_radius * 0.35, egui::Color32::WHITE);
    }

    fn draw_title(painter: &egui::Painter, anchor: egui::Pos2, title: &str) {
        let font = egui::FontId::proportional(12.0);
        let galley = painter.layout_no_wrap(title.to_string(), font.clone(), egui::Color32::WHITE);

        let padding = egui::vec2(4.0, 2.0);
        let text_pos = anchor + egui::vec2(0.0, -4.0);
        let box_rect = egui::Rect::from_center_size(
            text_pos - egui::vec2(0.0, galley.size().y / 2.0),
            galley.size() + padding * 2.0,
        );
        painter.rect_filled(box_rect, 3.0, egui::Color32::from_rgba_unmultiplied(0, 0, 0, 190));
        painter.text(text_pos, egui::Align2::CENTER_BOTTOM, title, font, egui::Color32::WHITE);
    }
}

impl Plugin for MarkersPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let painter = ui.painter().with_clip_rect(response.rect);
        let hover_pos = response.hover_pos();
        let selected = self.layer.selected();

        let project = |lon: f64, lat: f64| {
            let p = to_screen(projector, lon, lat);
            (p.x, p.y)
        };

        let mut hovered_title: Option<(egui::Pos2, &str)> = None;

        for (id, marker) in self.layer.iter() {
            let (x, y) = project(marker.lon, marker.lat);
            let (dx, dy) = marker.icon_size().anchor_offset();
            let size = marker.icon_size();
            #[allow(clippy::cast_precision_loss, reason = "icon sizes are small")]
            let rect = egui::Rect::from_min_size(
                egui::pos2(x + dx, y + dy),
                egui::vec2(size.width as f32, size.height as f32),
            );

            if !rect.intersects(response.rect) {
                continue;
            }

            match self.icons.get(&id) {
                Some(texture) => {
                    painter.image(
                        texture.id(),
                        rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                    if selected == Some(id) {
                        painter.rect_stroke(
                            rect.expand(1.0),
                            2.0,
                            egui::Stroke::new(2.0, egui::Color32::YELLOW),
                            egui::StrokeKind::Outside,
                        );
                    }
                }
                None => Self::draw_pin(&painter, rect, marker.kind, selected == Some(id)),
            }

            if let (Some(pos), Some(title)) = (hover_pos, marker.title.as_deref()) {
                if rect.contains(pos) {
                    hovered_title = Some((rect.center_top(), title));
                }
            }
        }

        if let Some((lon, lat)) = self.layer.crosslink() {
            let pos = to_screen(projector, lon, lat);
            painter.circle(
                pos,
                CROSSLINK_RADIUS,
                CROSSLINK_FILL,
                egui::Stroke::new(1.0, egui::Color32::BLACK),
            );
        }

        if let Some((anchor, title)) = hovered_title {
            Self::draw_title(&painter, anchor, title);
        }

        let pointer = hover_pos.map(|pos| to_map(projector, pos));
        let click = if response.clicked() {
            response.interact_pointer_pos().map(|pos| {
                let marker = self.layer.hit_test((pos.x, pos.y), |m| project(m.lon, m.lat));
                let (lon, lat) = to_map(projector, pos);
                MapClick { marker, lon, lat }
            })
        } else {
            None
        };

        with_events(&self.events, |events| {
            events.pointer = pointer;
            if click.is_some() {
                events.click = click;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_segment() {
        let a = egui::pos2(0.0, 0.0);
        let b = egui::pos2(10.0, 0.0);
        assert!((distance_to_segment(egui::pos2(5.0, 3.0), a, b) - 3.0).abs() < 1e-5);
        assert!((distance_to_segment(egui::pos2(-4.0, 3.0), a, b) - 5.0).abs() < 1e-5);
        assert!((distance_to_segment(egui::pos2(13.0, 4.0), a, b) - 5.0).abs() < 1e-5);
        assert!((distance_to_segment(egui::pos2(3.0, 4.0), a, a) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_near_polylines() {
        let lines = vec![
            vec![egui::pos2(0.0, 0.0), egui::pos2(100.0, 0.0)],
            vec![egui::pos2(200.0, 200.0)],
        ];
        assert!(near_polylines(egui::pos2(50.0, 5.0), &lines, 6.0));
        assert!(!near_polylines(egui::pos2(50.0, 7.0), &lines, 6.0));
        assert!(near_polylines(egui::pos2(203.0, 200.0), &lines, 6.0));
        assert!(!near_polylines(egui::pos2(50.0, 5.0), &[], 6.0));
    }
}
