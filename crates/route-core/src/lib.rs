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

//! Route map data library.
//!
//! Everything the route map viewer knows that does not need a window lives
//! here, split into independent layers:
//!
//! - **Viewport**: map centre and zoom, with its JSON form
//! - **Storage**: a string key-value store and viewport persistence on top of it
//! - **Route**: `<pic>`/`<poi>` place marker documents
//! - **Track**: GPX track overlay data and the elevation profile derived from it
//! - **Markers**: the marker layer (place markers, start marker, cross-link point)
//!
//! # Remembering the viewport
//!
//! ```
//! use route_core::storage::{remember_viewport, restore_viewport, MemoryStore};
//! use route_core::Viewport;
//!
//! let mut store = MemoryStore::new();
//! assert_eq!(restore_viewport(&store), Viewport::DEFAULT);
//!
//! let here = Viewport::new(-3.19, 55.95, 12);
//! remember_viewport(&mut store, &here).unwrap();
//! assert_eq!(restore_viewport(&store), here);
//! ```
//!
//! # Loading place markers
//!
//! ```
//! use route_core::route::{parse_route, MarkerKind};
//!
//! let xml = r#"<route>
//!     <poi lon="-5.9" lat="54.6" link="/poi/1" icon="/img/cafe.png" name="Cafe"/>
//!     <pic lon="-5.8" lat="54.5" link="/pic/7" icon="/img/camera.png"/>
//! </route>"#;
//!
//! let markers = parse_route(xml.as_bytes()).unwrap();
//! assert_eq!(markers[0].kind, MarkerKind::Pic);
//! assert_eq!(markers[1].title.as_deref(), Some("Cafe"));
//! ```

pub mod markers;
pub mod route;
pub mod storage;
pub mod track;
pub mod viewport;

pub use markers::{MarkerId, MarkerLayer, Selection};
pub use route::{parse_route, IconSize, MarkerKind, PlaceMarker, RouteError};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, VIEWPORT_KEY};
pub use track::{ElevationProfile, ProfilePoint, Track, TrackError, TrackPoint};
pub use viewport::Viewport;
