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

//! Route document parsing.
//!
//! A route document is XML with `<pic>` (photo) and `<poi>` (point of
//! interest) elements anywhere in the tree:
//!
//! ```text
//! <pic lon=".." lat=".." link="/pics/12" icon="/img/camera.png"/>
//! <poi lon=".." lat=".." link="/poi/3" icon="/img/pub.png" name="The Crown"/>
//! ```
//!
//! Each element becomes a [`PlaceMarker`]. All pics come before all pois so
//! pois are drawn on top.

use std::io::Read;

use log::{debug, warn};
use thiserror::Error;
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, XmlEvent};

/// Errors that can occur while reading a route document.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("malformed route document: {0}")]
    Xml(#[from] xml::reader::Error),
}

/// What a marker stands for. Decides its icon size and stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// A photo taken along the route.
    Pic,
    /// A named point of interest.
    Poi,
    /// The start point picked by clicking the map.
    Start,
}

impl MarkerKind {
    /// Icon size in pixels.
    #[must_use]
    pub fn icon_size(self) -> IconSize {
        match self {
            MarkerKind::Pic | MarkerKind::Start => IconSize::new(20, 34),
            MarkerKind::Poi => IconSize::new(28, 28),
        }
    }

    /// Stacking order; higher is drawn on top and wins clicks.
    #[must_use]
    pub fn z_index(self) -> i32 {
        match self {
            MarkerKind::Pic | MarkerKind::Poi => 0,
            MarkerKind::Start => 1,
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "pic" => Some(MarkerKind::Pic),
            "poi" => Some(MarkerKind::Poi),
            _ => None,
        }
    }
}

/// Marker icon size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconSize {
    pub width: u32,
    pub height: u32,
}

impl IconSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Offset from the marker coordinate to the icon's top-left corner.
    ///
    /// Icons are pins: centred horizontally with the bottom edge on the
    /// coordinate.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "icon sizes are small")]
    pub fn anchor_offset(self) -> (f32, f32) {
        (-(self.width as f32) / 2.0, -(self.height as f32))
    }
}

/// A marker placed on the map from a route document (or the start marker).
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceMarker {
    pub kind: MarkerKind,
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Where selecting the marker navigates to.
    pub link: Option<String>,
    /// Icon URL or path.
    pub icon: Option<String>,
    /// Hover title (pois only).
    pub title: Option<String>,
}

impl PlaceMarker {
    #[must_use]
    pub fn new(kind: MarkerKind, lon: f64, lat: f64) -> Self {
        Self {
            kind,
            lon,
            lat,
            link: None,
            icon: None,
            title: None,
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn icon_size(&self) -> IconSize {
        self.kind.icon_size()
    }

    #[must_use]
    pub fn z_index(&self) -> i32 {
        self.kind.z_index()
    }
}

fn attribute<'a>(attributes: &'a [OwnedAttribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.local_name == name)
        .map(|a| a.value.as_str())
}

fn parse_coordinate(attributes: &[OwnedAttribute], name: &'static str) -> Option<f64> {
    let raw = attribute(attributes, name)?;
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn marker_from_element(kind: MarkerKind, attributes: &[OwnedAttribute]) -> Option<PlaceMarker> {
    let (Some(lon), Some(lat)) = (
        parse_coordinate(attributes, "lon"),
        parse_coordinate(attributes, "lat"),
    ) else {
        warn!(
            "Skipping {:?} with bad coordinates lon={:?} lat={:?}",
            kind,
            attribute(attributes, "lon"),
            attribute(attributes, "lat")
        );
        return None;
    };

    let mut marker = PlaceMarker::new(kind, lon, lat);
    marker.link = attribute(attributes, "link").map(str::to_string);
    marker.icon = attribute(attributes, "icon").map(str::to_string);
    if kind == MarkerKind::Poi {
        marker.title = attribute(attributes, "name").map(str::to_string);
    }
    Some(marker)
}

/// Parse a route document into place markers: every `<pic>` in document
/// order followed by every `<poi>` in document order.
///
/// Elements with a missing or non-numeric `lon`/`lat` are skipped.
pub fn parse_route<R: Read>(reader: R) -> Result<Vec<PlaceMarker>, RouteError> {
    let mut pics = Vec::new();
    let mut pois = Vec::new();

    for event in EventReader::new(reader) {
        if let XmlEvent::StartElement {
            name, attributes, ..
        } = event?
        {
            let Some(kind) = MarkerKind::from_tag(&name.local_name) else {
                continue;
            };

            if let Some(marker) = marker_from_element(kind, &attributes) {
                match kind {
                    MarkerKind::Pic => pics.push(marker),
                    _ => pois.push(marker),
                }
            }
        }
    }

    debug!("Route document: {} pics, {} pois", pics.len(), pois.len());
    pics.extend(pois);
    Ok(pics)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTE: &str = r#"<?xml version="1.0"?>
<route name="Strangford loop">
  <poi lon="-5.70" lat="54.37" link="/poi/1" icon="/img/poi/pub.png" name="The Quays"/>
  <pic lon="-5.71" lat="54.38" link="/pics/10" icon="/img/pic.png"/>
  <section>
    <pic lon="-5.72" lat="54.39" link="/pics/11" icon="/img/pic.png"/>
  </section>
  <poi lon="-5.73" lat="54.40" link="/poi/2" icon="/img/poi/castle.png" name="Castle Ward"/>
</route>"#;

    #[test]
    fn test_pics_before_pois() {
        let markers = parse_route(ROUTE.as_bytes()).unwrap();
        let kinds: Vec<_> = markers.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MarkerKind::Pic, MarkerKind::Pic, MarkerKind::Poi, MarkerKind::Poi]
        );
        assert_eq!(markers[0].link.as_deref(), Some("/pics/10"));
        assert_eq!(markers[1].link.as_deref(), Some("/pics/11"));
        assert_eq!(markers[2].title.as_deref(), Some("The Quays"));
        assert_eq!(markers[3].title.as_deref(), Some("Castle Ward"));
    }

    #[test]
    fn test_attributes() {
        let markers = parse_route(ROUTE.as_bytes()).unwrap();
        let pic = &markers[0];
        assert!((pic.lon - (-5.71)).abs() < 1e-9);
        assert!((pic.lat - 54.38).abs() < 1e-9);
        assert_eq!(pic.icon.as_deref(), Some("/img/pic.png"));
        assert_eq!(pic.title, None);
    }

    #[test]
    fn test_icon_sizes() {
        let markers = parse_route(ROUTE.as_bytes()).unwrap();
        assert_eq!(markers[0].icon_size(), IconSize::new(20, 34));
        assert_eq!(markers[2].icon_size(), IconSize::new(28, 28));
        assert_eq!(MarkerKind::Start.icon_size(), IconSize::new(20, 34));
        assert_eq!(IconSize::new(20, 34).anchor_offset(), (-10.0, -34.0));
    }

    #[test]
    fn test_bad_coordinates_skipped() {
        let xml = r#"<route>
            <pic lon="abc" lat="54.0" link="/a"/>
            <pic lat="54.0" link="/b"/>
            <poi lon="-5.0" lat="NaN" name="x"/>
            <pic lon=" -5.5 " lat="54.5" link="/c"/>
        </route>"#;
        let markers = parse_route(xml.as_bytes()).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].link.as_deref(), Some("/c"));
    }

    #[test]
    fn test_pic_name_is_not_a_title() {
        let xml = r#"<r><pic lon="1" lat="2" name="ignored"/></r>"#;
        let markers = parse_route(xml.as_bytes()).unwrap();
        assert_eq!(markers[0].title, None);
        assert_eq!(markers[0].link, None);
    }

    #[test]
    fn test_empty_document() {
        let markers = parse_route("<route/>".as_bytes()).unwrap();
        assert!(markers.is_empty());
    }

    #[test]
    fn test_malformed_document() {
        let result = parse_route("<route><pic lon=\"1\"".as_bytes());
        assert!(matches!(result, Err(RouteError::Xml(_))));
    }
}
