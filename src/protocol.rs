//! Static JSON resources and local-storage payloads.
//!
//! This module owns **every record shape that leaves the process**: the
//! public files served next to the page, the exports an operator downloads
//! and re-uploads, and the private collections kept in browser storage.
//!
//! ## Shapes
//!
//! | Resource / key          | Payload                                  |
//! |-------------------------|------------------------------------------|
//! | `publicMarkers.json`    | `[{latlng:{lat,lng}, type, name}]`       |
//! | `publicTowns.json`      | `[{latlng:{lat,lng}, name}]`             |
//! | `privateMarkers` (key)  | same as `publicMarkers.json`             |
//! | `privateTowns` (key)    | same as `publicTowns.json`               |
//!
//! Marker `type` is kept as a raw string on the wire so one bad entry can be
//! skipped without rejecting the whole file.

use crate::error::Result;
use crate::types::{AnnotationId, MapPoint, Marker, MarkerKind, TownLabel};
use log::warn;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<MapPoint> for LatLng {
    fn from(p: MapPoint) -> Self {
        Self {
            lat: p.lat_y,
            lng: p.lng_x,
        }
    }
}

impl From<LatLng> for MapPoint {
    fn from(ll: LatLng) -> Self {
        MapPoint::new(ll.lat, ll.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkerRecord {
    pub latlng: LatLng,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl From<&Marker> for MarkerRecord {
    fn from(m: &Marker) -> Self {
        Self {
            latlng: m.position.into(),
            kind: m.kind.as_str().to_string(),
            name: m.label.clone(),
        }
    }
}

impl MarkerRecord {
    pub fn into_marker(self, id: AnnotationId) -> Result<Marker> {
        Ok(Marker {
            id,
            position: self.latlng.into(),
            kind: self.kind.parse::<MarkerKind>()?,
            label: self.name,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TownRecord {
    pub latlng: LatLng,
    pub name: String,
}

impl From<&TownLabel> for TownRecord {
    fn from(t: &TownLabel) -> Self {
        Self {
            latlng: t.position.into(),
            name: t.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a JSON array leniently: elements that do not match `T` are
/// skipped with a warning. A document that is not an array is an error.
fn parse_lenient<T: for<'de> Deserialize<'de>>(source: &str, json: &str) -> Result<Vec<T>> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut out = Vec::with_capacity(raw.len());
    for (i, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(r) => out.push(r),
            Err(e) => warn!("Skipping entry {} of {}: {}", i, source, e),
        }
    }
    Ok(out)
}

pub fn parse_marker_records(source: &str, json: &str) -> Result<Vec<MarkerRecord>> {
    parse_lenient(source, json)
}

pub fn parse_town_records(source: &str, json: &str) -> Result<Vec<TownRecord>> {
    parse_lenient(source, json)
}

/// Pretty-printed array, the format operators re-upload as a static file.
pub fn to_pretty_json<T: Serialize>(records: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Compact array, used for local storage.
pub fn to_compact_json<T: Serialize>(records: &[T]) -> Result<String> {
    Ok(serde_json::to_string(records)?)
}

// ---------------------------------------------------------------------------
// Resource names
// ---------------------------------------------------------------------------

/// Default resource names and storage keys, as constants.
pub mod resources {
    pub const PUBLIC_MARKERS: &str = "publicMarkers.json";
    pub const PUBLIC_TOWNS: &str = "publicTowns.json";

    pub const PRIVATE_MARKERS_KEY: &str = "privateMarkers";
    pub const PRIVATE_TOWNS_KEY: &str = "privateTowns";
}
