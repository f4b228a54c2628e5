//! Core map types shared across all modules.

use crate::error::{Result, ViewerError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A position in image/pixel space, as produced by renderer click and hover
/// events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MapPoint {
    pub lat_y: f64,
    pub lng_x: f64,
}

impl MapPoint {
    pub fn new(lat_y: f64, lng_x: f64) -> Self {
        Self { lat_y, lng_x }
    }
}

impl std::fmt::Display for MapPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.lat_y, self.lng_x)
    }
}

/// A position in game block space. Always derived from a [`MapPoint`],
/// never stored.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameCoord {
    pub x: i64,
    pub z: i64,
}

impl GameCoord {
    pub fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }
}

impl std::fmt::Display for GameCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "X: {} | Z: {}", self.x, self.z)
    }
}

// ---------------------------------------------------------------------------
// Marker kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    House,
    Trader,
    Tower,
    Tent,
    Safezone,
    Infrastructure,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 6] = [
        MarkerKind::House,
        MarkerKind::Trader,
        MarkerKind::Tower,
        MarkerKind::Tent,
        MarkerKind::Safezone,
        MarkerKind::Infrastructure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::House => "house",
            MarkerKind::Trader => "trader",
            MarkerKind::Tower => "tower",
            MarkerKind::Tent => "tent",
            MarkerKind::Safezone => "safezone",
            MarkerKind::Infrastructure => "infrastructure",
        }
    }

    /// Fill/stroke colour used by the renderer.
    pub fn color(&self) -> &'static str {
        match self {
            MarkerKind::House => "red",
            MarkerKind::Trader => "orange",
            MarkerKind::Tower => "yellow",
            MarkerKind::Tent => "green",
            MarkerKind::Safezone => "blue",
            MarkerKind::Infrastructure => "purple",
        }
    }
}

impl FromStr for MarkerKind {
    type Err = ViewerError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        MarkerKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| ViewerError::InvalidKind(s.to_string()))
    }
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// Session-local identity of an annotation. Assigned on insertion, never
/// persisted; doubles as the renderer layer id.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct AnnotationId(pub u64);

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: AnnotationId,
    pub position: MapPoint,
    pub kind: MarkerKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TownLabel {
    pub id: AnnotationId,
    pub position: MapPoint,
    pub name: String,
}

/// Which collection an annotation belongs to.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Public,
    Private,
}

/// The two annotation families, used to pick resources and exports.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Markers,
    Towns,
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationKind::Markers => f.write_str("markers"),
            AnnotationKind::Towns => f.write_str("towns"),
        }
    }
}

/// Selects annotations for edit/delete.
///
/// `Name` matches every entry sharing the name; duplicates are all affected.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationMatcher {
    Name(String),
    Id(AnnotationId),
    Position(MapPoint),
}

impl AnnotationMatcher {
    pub fn matches(&self, id: AnnotationId, position: &MapPoint, name: &str) -> bool {
        match self {
            AnnotationMatcher::Name(n) => n == name,
            AnnotationMatcher::Id(i) => *i == id,
            AnnotationMatcher::Position(p) => p == position,
        }
    }
}

impl From<&str> for AnnotationMatcher {
    fn from(name: &str) -> Self {
        AnnotationMatcher::Name(name.to_string())
    }
}
