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

mod app;
mod config;
mod loader;
mod map;
mod status;
mod ui;

use clap::Parser;
use eframe::egui;
use mimalloc::MiMalloc;
use route_core::Viewport;

use app::{RouteMapApp, StartupOptions};
use config::AppConfig;
use map::BaseLayer;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Slippy map with route markers, a GPX track and its elevation profile
#[derive(Parser, Debug)]
#[command(name = "routemap", version, about)]
struct Args {
    /// Route document with <pic> and <poi> markers (URL or path)
    #[arg(long, value_name = "URL|PATH")]
    route: Option<String>,

    /// GPX track to overlay (URL or path)
    #[arg(long, value_name = "URL|PATH")]
    gpx: Option<String>,

    /// Elevation series as JSON [{"x", "y", "lon", "lat"}] (URL or path)
    #[arg(long, value_name = "URL|PATH")]
    profile: Option<String>,

    /// Start longitude; needs --lat and --zoom
    #[arg(long, allow_negative_numbers = true, requires_all = ["lat", "zoom"])]
    lon: Option<f64>,

    /// Start latitude; needs --lon and --zoom
    #[arg(long, allow_negative_numbers = true, requires_all = ["lon", "zoom"])]
    lat: Option<f64>,

    /// Start zoom level; needs --lon and --lat
    #[arg(long, requires_all = ["lon", "lat"])]
    zoom: Option<u8>,

    /// Base layer, overriding the saved choice
    #[arg(long, value_enum)]
    layer: Option<BaseLayer>,

    /// Do not remember the map position between runs
    #[arg(long)]
    no_persist: bool,

    /// Centre the map on the GPX track once it loads
    #[arg(long)]
    fit_track: bool,
}

impl Args {
    fn viewport(&self) -> Option<Viewport> {
        match (self.lon, self.lat, self.zoom) {
            (Some(lon), Some(lat), Some(zoom)) => Some(Viewport::new(lon, lat, zoom)),
            _ => None,
        }
    }

    fn startup_options(self) -> StartupOptions {
        StartupOptions {
            viewport: self.viewport(),
            route: self.route,
            gpx: self.gpx,
            profile: self.profile,
            no_persist: self.no_persist,
            fit_track: self.fit_track,
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    if let Ok(path) = AppConfig::get_config_path() {
        log::info!("Config file: {}", path.display());
    }
    if let Some(layer) = args.layer {
        config.base_layer = layer;
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Route Map"),
        ..Default::default()
    };

    let startup = args.startup_options();
    log::info!("Starting Route Map");
    eframe::run_native(
        "Route Map",
        options,
        Box::new(|cc| Ok(Box::new(RouteMapApp::new(&cc.egui_ctx, config, startup)))),
    )
}
