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

//! The route map window.
//!
//! Owns the map, the marker layer, the loaded track and profile, and wires
//! them together: chart and track hover drive the cross-link marker, map
//! clicks drop the start marker or follow a marker link, and viewport
//! changes are remembered in the local store.

use eframe::egui;
use route_core::markers::resolve_href;
use route_core::storage::{remember_viewport, restore_viewport};
use route_core::{
    parse_route, ElevationProfile, FileStore, KeyValueStore, MarkerId, MarkerLayer, MemoryStore,
    PlaceMarker, Selection, Track, Viewport,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use walkers::{Map, MapMemory, Position};

use crate::config::{AppConfig, APP_NAME};
use crate::loader::{Load, Source};
use crate::map::{
    self, BaseTiles, IconCache, MapClick, MapEvents, MarkersPlugin, SharedMapEvents, TrackPlugin,
};
use crate::status::{StatusLevel, StatusLog};
use crate::ui::{controls, ElevationChart};

/// Map size assumed before the first frame has been laid out
const DEFAULT_MAP_SIZE: egui::Vec2 = egui::vec2(1000.0, 600.0);

/// What the command line asked for at startup
#[derive(Debug, Default, Clone)]
pub struct StartupOptions {
    pub route: Option<String>,
    pub gpx: Option<String>,
    pub profile: Option<String>,
    /// Explicit starting viewport; wins over the stored one
    pub viewport: Option<Viewport>,
    /// Keep the viewport in memory only
    pub no_persist: bool,
    /// Centre and zoom the map on the track once it loads
    pub fit_track: bool,
}

/// Pick the viewport to open with: explicit first, then the stored one
/// (which itself falls back to the default position).
fn initial_viewport<S: KeyValueStore + ?Sized>(explicit: Option<Viewport>, store: &S) -> Viewport {
    explicit.unwrap_or_else(|| restore_viewport(store)).clamped()
}

fn open_store(no_persist: bool) -> Box<dyn KeyValueStore> {
    if no_persist {
        log::info!("Map position will not be persisted");
        return Box::new(MemoryStore::new());
    }

    match FileStore::open_default(APP_NAME) {
        Ok(store) => {
            log::info!("Local storage at {}", store.path().display());
            Box::new(store)
        }
        Err(e) => {
            log::warn!("Local storage unavailable, map position will not persist: {}", e);
            Box::new(MemoryStore::new())
        }
    }
}

/// Read-only copy of the marker layer handed to the markers plugin
fn visible_markers(layer: &MarkerLayer, show_markers: bool) -> MarkerLayer {
    let mut visible = layer.clone();
    if !show_markers {
        visible.clear_route_markers();
    }
    visible
}

/// Where the cross-link point goes for a pointer over the track: the
/// closest recorded track point, so it sits on the line rather than beside it
fn track_crosslink(track: Option<&Track>, lon: f64, lat: f64) -> (f64, f64) {
    track
        .and_then(|track| track.nearest_point(lon, lat))
        .map_or((lon, lat), |p| (p.lon, p.lat))
}

fn is_loading<T: Send + 'static>(load: Option<&Load<T>>) -> bool {
    load.is_some_and(Load::is_loading)
}

pub struct RouteMapApp {
    config: AppConfig,
    store: Box<dyn KeyValueStore>,

    map_memory: MapMemory,
    tiles: BaseTiles,
    /// Centre the map starts from, before the user moves it
    home: Position,
    /// Last viewport written to the store
    remembered: Viewport,
    map_size: egui::Vec2,
    fit_track: bool,

    markers: MarkerLayer,
    icons: IconCache,
    track: Option<Track>,
    chart: Option<ElevationChart>,

    route_load: Option<Load<Vec<PlaceMarker>>>,
    track_load: Option<Load<Track>>,
    profile_load: Option<Load<ElevationProfile>>,

    events: SharedMapEvents,
    pointer: Option<(f64, f64)>,
    start: Option<(f64, f64)>,
    status: StatusLog,
}

impl RouteMapApp {
    pub fn new(ctx: &egui::Context, config: AppConfig, options: StartupOptions) -> Self {
        let store = open_store(options.no_persist);
        let viewport = initial_viewport(options.viewport, store.as_ref());
        log::info!(
            "Starting at {:.5}, {:.5} zoom {}",
            viewport.lon,
            viewport.lat,
            viewport.zoom
        );

        let mut map_memory = MapMemory::default();
        map::apply_viewport(&mut map_memory, &viewport);

        let tiles = BaseTiles::new(config.resolve_thunderforest_key());
        let markers = MarkerLayer::new(resolve_href(
            config.site_base_url.as_deref(),
            &config.start_marker_icon,
        ));

        let mut app = Self {
            store,
            map_memory,
            tiles,
            home: map::position(&viewport),
            remembered: viewport,
            map_size: DEFAULT_MAP_SIZE,
            fit_track: options.fit_track && options.viewport.is_none(),
            markers,
            icons: IconCache::new(),
            track: None,
            chart: None,
            route_load: None,
            track_load: None,
            profile_load: None,
            events: Arc::new(Mutex::new(MapEvents::default())),
            pointer: None,
            start: None,
            status: StatusLog::new(),
            config,
        };

        if let Some(route) = options.route {
            app.load_route(ctx, Source::parse(&route));
        }
        if let Some(gpx) = options.gpx {
            app.load_track(ctx, Source::parse(&gpx));
        }
        if let Some(profile) = options.profile {
            app.load_profile(ctx, Source::parse(&profile));
        }

        app
    }

    fn load_route(&mut self, ctx: &egui::Context, source: Source) {
        self.status.info(format!("Loading route {source}"));
        self.route_load = Some(Load::spawn(source, ctx, |bytes| Ok(parse_route(bytes)?)));
    }

    fn load_track(&mut self, ctx: &egui::Context, source: Source) {
        self.status.info(format!("Loading track {source}"));
        self.track_load = Some(Load::spawn(source, ctx, |bytes| Ok(Track::from_gpx(bytes)?)));
    }

    fn load_profile(&mut self, ctx: &egui::Context, source: Source) {
        self.status.info(format!("Loading profile {source}"));
        self.profile_load = Some(Load::spawn(source, ctx, |bytes| {
            Ok(ElevationProfile::from_json(bytes)?)
        }));
    }

    /// Hand finished background loads over to the map
    fn poll_loads(&mut self) {
        if let Some(load) = self.route_load.as_mut() {
            match load.take() {
                Some(Ok(markers)) => {
                    log::info!("Loaded {} markers from {}", markers.len(), load.source);
                    self.status
                        .info(format!("{} markers from {}", markers.len(), load.source));
                    self.markers.clear_route_markers();
                    self.markers.extend(markers);
                    self.route_load = None;
                }
                Some(Err(e)) => {
                    self.status
                        .error(format!("Failed to load route {}: {}", load.source, e));
                    self.route_load = None;
                }
                None => {}
            }
        }

        if let Some(load) = self.track_load.as_mut() {
            match load.take() {
                Some(Ok(track)) => {
                    let name = track.name.clone().unwrap_or_else(|| load.source.to_string());
                    log::info!(
                        "Loaded track {} with {} points, {:.1} km",
                        name,
                        track.len(),
                        track.total_distance_m() / 1000.0
                    );
                    self.status.info(format!(
                        "Track {}: {:.1} km",
                        name,
                        track.total_distance_m() / 1000.0
                    ));
                    self.track_loaded(track);
                    self.track_load = None;
                }
                Some(Err(e)) => {
                    self.status
                        .error(format!("Failed to load track {}: {}", load.source, e));
                    self.track_load = None;
                }
                None => {}
            }
        }

        if let Some(load) = self.profile_load.as_mut() {
            match load.take() {
                Some(Ok(profile)) => {
                    log::info!("Loaded profile with {} points from {}", profile.len(), load.source);
                    self.chart = Some(ElevationChart::new(profile));
                    self.profile_load = None;
                }
                Some(Err(e)) => {
                    self.status
                        .error(format!("Failed to load profile {}: {}", load.source, e));
                    self.profile_load = None;
                }
                None => {}
            }
        }
    }

    fn track_loaded(&mut self, track: Track) {
        // An explicit profile file wins over one derived from the track
        let profile_pending = self.profile_load.is_some();
        if self.chart.is_none() && !profile_pending {
            let profile = track.elevation_profile();
            if profile.is_empty() {
                self.status
                    .push(StatusLevel::Warning, "Track has no elevation data");
            } else {
                self.chart = Some(ElevationChart::new(profile));
            }
        }

        if self.fit_track {
            if let Some(bounds) = track.bounds() {
                let viewport = map::fit_viewport(&bounds, self.map_size.x, self.map_size.y);
                log::debug!("Fitting map to track at zoom {}", viewport.zoom);
                map::apply_viewport(&mut self.map_memory, &viewport);
            }
            self.fit_track = false;
        }

        self.track = Some(track);
    }

    fn save_config(&mut self) {
        if let Err(e) = self.config.save() {
            log::error!("Failed to save config: {}", e);
            self.status.error(format!("Failed to save config: {e}"));
        }
    }

    /// Resolve marker icons to textures, starting loads as needed
    fn marker_textures(&self, ctx: &egui::Context) -> HashMap<MarkerId, egui::TextureHandle> {
        let base = self.config.site_base_url.as_deref();
        self.markers
            .iter()
            .filter_map(|(id, marker)| {
                let href = resolve_href(base, marker.icon.as_deref()?);
                self.icons.get_or_load(ctx, &href).map(|texture| (id, texture))
            })
            .collect()
    }

    fn handle_click(&mut self, click: MapClick) {
        match self.markers.click(click.marker) {
            Selection::Navigate(link) => {
                let url = resolve_href(self.config.site_base_url.as_deref(), &link);
                log::info!("Opening {}", url);
                if let Err(e) = webbrowser::open(&url) {
                    log::error!("Failed to open {}: {}", url, e);
                    self.status.error(format!("Cannot open {url}"));
                }
            }
            Selection::Selected(_) => {}
            Selection::Cleared => {
                self.markers.place_start_marker(click.lon, click.lat);
                self.start = Some((click.lon, click.lat));
            }
        }
    }

    /// Store the viewport once the user has finished moving the map
    fn remember_if_moved(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.pointer.any_down()) {
            return;
        }

        let current = map::current_viewport(&self.map_memory, self.home);
        if !current.differs_from(&self.remembered) {
            return;
        }

        match remember_viewport(self.store.as_mut(), &current) {
            Ok(()) => self.remembered = current,
            Err(e) => {
                log::warn!("Failed to remember map position: {}", e);
                // Do not retry every frame
                self.remembered = current;
            }
        }
    }

    fn draw_map(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        self.map_size = ui.available_size();

        let track_plugin = self
            .track
            .as_ref()
            .filter(|_| self.config.show_track)
            .map(|track| TrackPlugin {
                segments: track
                    .segments()
                    .iter()
                    .map(|segment| segment.iter().map(|p| (p.lon, p.lat)).collect())
                    .collect(),
                hover_tolerance: self.config.hover_tolerance_px,
                events: self.events.clone(),
            });

        let markers_plugin = MarkersPlugin {
            layer: visible_markers(&self.markers, self.config.show_markers),
            icons: self.marker_textures(&ctx),
            events: self.events.clone(),
        };

        let tiles = self.tiles.get_or_create_layer(self.config.base_layer, &ctx);
        // Plain wheel zooms, as on the web map
        let mut map =
            Map::new(Some(tiles), &mut self.map_memory, self.home).zoom_with_ctrl(false);
        if let Some(plugin) = track_plugin {
            map = map.with_plugin(plugin);
        }
        ui.add(map.with_plugin(markers_plugin));

        let events = std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );

        self.pointer = events.pointer;
        if let Some((lon, lat)) = events.track_hover {
            let (lon, lat) = track_crosslink(self.track.as_ref(), lon, lat);
            self.markers.move_crosslink_marker(lon, lat);
        }
        if let Some(click) = events.click {
            self.handle_click(click);
        }
    }

    fn draw_controls(&mut self, ctx: &egui::Context) {
        egui::Window::new("Layers")
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
            .resizable(false)
            .collapsible(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                if controls::layer_switcher(ui, &mut self.config, self.track.is_some()) {
                    log::debug!("Base layer {}", self.config.base_layer.display_name());
                    self.save_config();
                }

                ui.separator();
                ui.label("Start");
                controls::start_fields(ui, self.start);

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Route...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Route document", &["xml"])
                            .add_filter("All Files", &["*"])
                            .pick_file()
                        {
                            self.load_route(ctx, Source::Path(path));
                        }
                    }
                    if ui.button("GPX...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("GPX", &["gpx"])
                            .add_filter("All Files", &["*"])
                            .pick_file()
                        {
                            self.load_track(ctx, Source::Path(path));
                        }
                    }
                    if ui.button("Profile...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Profile series", &["json"])
                            .add_filter("All Files", &["*"])
                            .pick_file()
                        {
                            self.load_profile(ctx, Source::Path(path));
                        }
                    }
                });

                ui.collapsing("Messages", |ui| {
                    controls::status_history(ui, &self.status);
                });
            });
    }
}

impl eframe::App for RouteMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_loads();

        egui::TopBottomPanel::bottom("mouse_position")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    controls::mouse_position(ui, self.pointer);
                    let loading = is_loading(self.route_load.as_ref())
                        || is_loading(self.track_load.as_ref())
                        || is_loading(self.profile_load.as_ref());
                    if loading {
                        ui.separator();
                        ui.spinner();
                    }
                });
            });

        if self.config.show_elevation {
            if let Some(chart) = &self.chart {
                let hovered = egui::TopBottomPanel::bottom("elevation_profile")
                    .resizable(true)
                    .default_height(self.config.elevation_panel_height)
                    .show(ctx, |ui| chart.show(ui))
                    .inner;

                if let Some(point) = hovered {
                    self.markers.move_crosslink_marker(point.lon, point.lat);
                }
            }
        }

        let map_rect = egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_map(ui);
                ui.max_rect()
            })
            .inner;

        if let Some(step) = controls::zoom_buttons(ctx, map_rect) {
            map::step_zoom(&mut self.map_memory, step);
        }
        controls::attribution(ctx, map_rect, self.config.base_layer);

        self.draw_controls(ctx);
        controls::status_bubble(ctx, map_rect, &self.status);

        self.remember_if_moved(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_viewport_wins() {
        let mut store = MemoryStore::new();
        remember_viewport(&mut store, &Viewport::new(1.0, 2.0, 9)).unwrap();

        let explicit = Viewport::new(-6.0, 54.0, 12);
        assert_eq!(initial_viewport(Some(explicit), &store), explicit);
    }

    #[test]
    fn test_stored_viewport_used() {
        let mut store = MemoryStore::new();
        let stored = Viewport::new(-5.93, 54.6, 14);
        remember_viewport(&mut store, &stored).unwrap();
        assert_eq!(initial_viewport(None, &store), stored);
    }

    #[test]
    fn test_default_viewport_without_state() {
        assert_eq!(initial_viewport(None, &MemoryStore::new()), Viewport::DEFAULT);
    }

    #[test]
    fn test_explicit_viewport_is_clamped() {
        let viewport = initial_viewport(Some(Viewport::new(0.0, 89.0, 25)), &MemoryStore::new());
        assert!(viewport.lat < 85.1);
        assert_eq!(viewport.zoom, 19);
    }

    #[test]
    fn test_track_hover_snaps_to_track() {
        let track = Track::from_segments(
            None,
            vec![vec![(-5.90, 54.60, None), (-5.80, 54.60, None), (-5.70, 54.60, None)]],
        );
        assert_eq!(track_crosslink(Some(&track), -5.79, 54.601), (-5.80, 54.60));
        assert_eq!(track_crosslink(None, -5.79, 54.601), (-5.79, 54.601));
    }

    #[test]
    fn test_hidden_markers_keep_start() {
        let mut layer = MarkerLayer::new("start.png");
        layer.add_place_marker(PlaceMarker::new(route_core::MarkerKind::Pic, 0.0, 0.0));
        layer.place_start_marker(1.0, 1.0);

        assert_eq!(visible_markers(&layer, true).len(), 2);
        let hidden = visible_markers(&layer, false);
        assert_eq!(hidden.len(), 1);
        assert!(hidden.start_marker().is_some());
    }
}
