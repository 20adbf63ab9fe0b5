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

//! Map controls: layer switcher, zoom buttons, attribution, mouse position,
//! start coordinates and the status bubble.

use chrono::Utc;
use egui::{Color32, RichText};

use crate::config::AppConfig;
use crate::map::{BaseLayer, ZoomStep};
use crate::status::{StatusLevel, StatusLog};

/// Coordinates are shown to five decimal places (about a metre)
pub fn format_coordinate(value: f64) -> String {
    format!("{value:.5}")
}

/// Base layer radio buttons plus overlay toggles.
///
/// Returns `true` when the user changed anything, so the caller can save
/// the config.
pub fn layer_switcher(ui: &mut egui::Ui, config: &mut AppConfig, has_track: bool) -> bool {
    let mut changed = false;

    ui.label(
        RichText::new("BASE LAYER")
            .color(Color32::from_rgb(150, 150, 150))
            .size(10.0)
            .strong(),
    );
    for layer in BaseLayer::ALL {
        changed |= ui
            .radio_value(&mut config.base_layer, layer, layer.display_name())
            .changed();
    }

    ui.add_space(4.0);
    ui.label(
        RichText::new("OVERLAYS")
            .color(Color32::from_rgb(150, 150, 150))
            .size(10.0)
            .strong(),
    );
    ui.add_enabled_ui(has_track, |ui| {
        changed |= ui.checkbox(&mut config.show_track, "Track").changed();
    });
    changed |= ui.checkbox(&mut config.show_markers, "Markers").changed();
    changed |= ui.checkbox(&mut config.show_elevation, "Elevation profile").changed();

    changed
}

/// Pointer position readout
pub fn mouse_position(ui: &mut egui::Ui, pointer: Option<(f64, f64)>) {
    let text = match pointer {
        Some((lon, lat)) => format!("{}, {}", format_coordinate(lon), format_coordinate(lat)),
        None => String::from("-"),
    };
    ui.label(RichText::new(text).monospace().size(11.0));
}

/// Read-only lon/lat fields filled by the start marker
pub fn start_fields(ui: &mut egui::Ui, start: Option<(f64, f64)>) {
    let (mut lon, mut lat) = start
        .map(|(lon, lat)| (format_coordinate(lon), format_coordinate(lat)))
        .unwrap_or_default();

    egui::Grid::new("start_fields").num_columns(2).show(ui, |ui| {
        ui.label("lon");
        ui.add(egui::TextEdit::singleline(&mut lon).desired_width(90.0).interactive(false));
        ui.end_row();
        ui.label("lat");
        ui.add(egui::TextEdit::singleline(&mut lat).desired_width(90.0).interactive(false));
        ui.end_row();
    });
}

/// Credit for the active base layer, linked to its source, in the bottom
/// right corner of the map
pub fn attribution(ctx: &egui::Context, map_rect: egui::Rect, layer: BaseLayer) {
    let credit = layer.attribution();
    egui::Area::new(egui::Id::new("map_attribution"))
        .order(egui::Order::Foreground)
        .pivot(egui::Align2::RIGHT_BOTTOM)
        .fixed_pos(map_rect.right_bottom() - egui::vec2(4.0, 4.0))
        .show(ctx, |ui| {
            egui::Frame::NONE
                .fill(Color32::from_rgba_unmultiplied(255, 255, 255, 180))
                .inner_margin(egui::Margin::symmetric(4, 1))
                .show(ui, |ui| {
                    ui.hyperlink_to(RichText::new(credit.text).size(10.0), credit.url);
                });
        });
}

/// Zoom in/out buttons in the top left corner of the map
pub fn zoom_buttons(ctx: &egui::Context, map_rect: egui::Rect) -> Option<ZoomStep> {
    let mut step = None;
    egui::Area::new(egui::Id::new("map_zoom_buttons"))
        .order(egui::Order::Foreground)
        .fixed_pos(map_rect.left_top() + egui::vec2(10.0, 10.0))
        .show(ctx, |ui| {
            let size = egui::vec2(28.0, 28.0);
            if ui.add_sized(size, egui::Button::new(RichText::new("+").size(16.0))).clicked() {
                step = Some(ZoomStep::In);
            }
            if ui.add_sized(size, egui::Button::new(RichText::new("-").size(16.0))).clicked() {
                step = Some(ZoomStep::Out);
            }
        });
    step
}

fn level_style(level: StatusLevel) -> (&'static str, Color32) {
    match level {
        StatusLevel::Info => ("ℹ", Color32::from_rgb(100, 180, 255)),
        StatusLevel::Warning => ("⚠", Color32::from_rgb(255, 200, 100)),
        StatusLevel::Error => ("✕", Color32::from_rgb(255, 100, 100)),
    }
}

/// Floating bubble with the newest status message, anchored to the bottom
/// left of `rect`
pub fn status_bubble(ctx: &egui::Context, rect: egui::Rect, status: &StatusLog) {
    let Some(message) = status.bubble(Utc::now()) else {
        return;
    };

    let (icon, color) = level_style(message.level);
    egui::Area::new(egui::Id::new("status_bubble"))
        .order(egui::Order::Foreground)
        .fixed_pos(rect.left_bottom() + egui::vec2(10.0, -40.0))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(icon).color(color));
                    ui.label(&message.message);
                });
            });
        });

    // Repaint once more so the bubble disappears when it expires
    ctx.request_repaint_after(std::time::Duration::from_secs(1));
}

/// Recent messages, newest first
pub fn status_history(ui: &mut egui::Ui, status: &StatusLog) {
    egui::ScrollArea::vertical()
        .max_height(120.0)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            for message in status.iter() {
                ui.horizontal(|ui| {
                    let (icon, color) = level_style(message.level);
                    ui.label(RichText::new(icon).color(color).size(9.0));
                    ui.label(
                        RichText::new(message.timestamp.format("%H:%M:%S").to_string())
                            .color(Color32::from_rgb(100, 100, 100))
                            .size(8.0)
                            .monospace(),
                    );
                    ui.label(RichText::new(&message.message).size(9.0));
                });
            }
        });
}
