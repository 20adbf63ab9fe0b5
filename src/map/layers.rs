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

//! Base map layers.

use eframe::egui;
use serde::{Deserialize, Serialize};
use walkers::sources::{Attribution, TileSource};
use walkers::{HttpOptions, HttpTiles, TileId};

use crate::config::APP_NAME;

/// Selectable base layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BaseLayer {
    /// Standard OpenStreetMap rendering
    #[default]
    Mapnik,
    /// OpenCycleMap rendering
    #[value(name = "cyclemap")]
    CycleMap,
}

impl BaseLayer {
    pub const ALL: [BaseLayer; 2] = [BaseLayer::Mapnik, BaseLayer::CycleMap];

    /// Directory name for the tile cache
    pub fn as_str(self) -> &'static str {
        match self {
            BaseLayer::Mapnik => "mapnik",
            BaseLayer::CycleMap => "cyclemap",
        }
    }

    /// Get human-readable display name
    pub fn display_name(self) -> &'static str {
        match self {
            BaseLayer::Mapnik => "Mapnik",
            BaseLayer::CycleMap => "CycleMap",
        }
    }

    /// Credit line shown over the map while this layer is active
    pub fn attribution(self) -> Attribution {
        match self {
            BaseLayer::Mapnik => MapnikSource.attribution(),
            BaseLayer::CycleMap => CycleMapSource::new(None).attribution(),
        }
    }
}

/// Tile source for the standard OpenStreetMap (Mapnik) tiles
pub struct MapnikSource;

impl TileSource for MapnikSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.openstreetmap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenStreetMap contributors",
            url: "https://www.openstreetmap.org/copyright",
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// Tile source for OpenCycleMap, served by Thunderforest
pub struct CycleMapSource {
    api_key: Option<String>,
}

impl CycleMapSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

impl TileSource for CycleMapSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        // Subdomain load balancing (a, b, c) based on tile coordinates
        let subdomain = ['a', 'b', 'c'][((tile_id.x + tile_id.y) % 3) as usize];
        let base = format!(
            "https://{}.tile.thunderforest.com/cycle/{}/{}/{}.png",
            subdomain, tile_id.zoom, tile_id.x, tile_id.y
        );

        match &self.api_key {
            Some(key) => format!("{base}?apikey={key}"),
            None => base,
        }
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "Maps © Thunderforest, Data © OpenStreetMap contributors",
            url: "https://www.thunderforest.com/",
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// Lazily created tile fetchers, one per base layer
pub struct BaseTiles {
    mapnik: Option<HttpTiles>,
    cycle_map: Option<HttpTiles>,
    thunderforest_key: Option<String>,
}

impl BaseTiles {
    pub fn new(thunderforest_key: Option<String>) -> Self {
        if thunderforest_key.is_none() {
            log::info!("No Thunderforest API key; CycleMap tiles will carry a watermark");
        }

        Self {
            mapnik: None,
            cycle_map: None,
            thunderforest_key,
        }
    }

    /// Get or create HttpTiles for a specific layer
    pub fn get_or_create_layer(&mut self, layer: BaseLayer, ctx: &egui::Context) -> &mut HttpTiles {
        let slot = match layer {
            BaseLayer::Mapnik => &mut self.mapnik,
            BaseLayer::CycleMap => &mut self.cycle_map,
        };

        let key = self.thunderforest_key.clone();
        slot.get_or_insert_with(|| {
            let cache_dir = dirs::cache_dir()
                .unwrap_or_else(|| std::path::PathBuf::from(".cache"))
                .join(APP_NAME)
                .join("tiles")
                .join(layer.as_str());

            let http_options = HttpOptions {
                cache: Some(cache_dir),
                ..Default::default()
            };

            log::debug!("Creating tile fetcher for {}", layer.display_name());
            match layer {
                BaseLayer::Mapnik => HttpTiles::with_options(MapnikSource, http_options, ctx.clone()),
                BaseLayer::CycleMap => {
                    HttpTiles::with_options(CycleMapSource::new(key), http_options, ctx.clone())
                }
            }
        })
    }
}
