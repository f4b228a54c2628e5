//! Coordinate conversion between image pixel space and game block space.
//!
//! The map image is a square of [`MAP_SIZE`] pixels. Block `(0, 0)` sits at
//! pixel `(ORIGIN, ORIGIN)`; `x` grows with `lng_x`, `z` grows as `lat_y`
//! shrinks. The offsets shift the block grid relative to the image and are
//! zero for the shipped map.

use crate::error::{Result, ViewerError};
use crate::types::{GameCoord, MapPoint};
use serde::{Deserialize, Serialize};

pub const MAP_SIZE: f64 = 2944.0;
pub const ORIGIN: f64 = 1408.0;
pub const OFFSET_X: f64 = 0.0;
pub const OFFSET_Z: f64 = 0.0;
/// Grid line spacing in blocks.
pub const GRID_SPACING: f64 = 32.0;

// ---------------------------------------------------------------------------
// Pure conversions
// ---------------------------------------------------------------------------

/// Half-up rounding (`-0.5 → 0`), matching the browser's `Math.round`.
fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

pub fn to_game_coord(point: MapPoint, origin: f64, offset_x: f64, offset_z: f64) -> GameCoord {
    GameCoord {
        x: round_half_up(point.lng_x - origin + offset_x),
        z: round_half_up(origin - point.lat_y + offset_z),
    }
}

pub fn to_map_point(coord: GameCoord, origin: f64, offset_x: f64, offset_z: f64) -> MapPoint {
    MapPoint {
        lng_x: coord.x as f64 - offset_x + origin,
        lat_y: origin - (coord.z as f64 - offset_z),
    }
}

/// Block deltas between two map points: `dx = round(Δlng)`, `dz = round(Δ-lat)`.
pub fn block_delta(from: MapPoint, to: MapPoint) -> (i64, i64) {
    (
        round_half_up(to.lng_x - from.lng_x),
        round_half_up(from.lat_y - to.lat_y),
    )
}

/// Euclidean distance in blocks, computed on the rounded deltas.
pub fn block_distance(from: MapPoint, to: MapPoint) -> f64 {
    let (dx, dz) = block_delta(from, to);
    ((dx * dx + dz * dz) as f64).sqrt()
}

/// Parse user input of the form `"X Z"` (two whitespace-separated integers).
pub fn parse_coord_input(input: &str) -> Result<GameCoord> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let [x, z] = parts.as_slice() else {
        return Err(ViewerError::MalformedInput("use format: X Z".to_string()));
    };

    let parse = |s: &str| {
        s.parse::<i64>()
            .map_err(|_| ViewerError::MalformedInput(format!("invalid number '{}'", s)))
    };

    Ok(GameCoord::new(parse(*x)?, parse(*z)?))
}

// ---------------------------------------------------------------------------
// Map geometry
// ---------------------------------------------------------------------------

/// Fixed map configuration. The defaults are the named constants above.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MapGeometry {
    /// Side length of the square map image, in pixels.
    pub map_size: f64,
    pub origin: f64,
    pub offset_x: f64,
    pub offset_z: f64,
    pub grid_spacing: f64,
    /// Base image drawn under everything else.
    pub image: String,
    pub min_zoom: i32,
    pub max_zoom: i32,
    /// Zoom used by "center map".
    pub center_zoom: i32,
    /// Zoom used by "go to coordinates".
    pub goto_zoom: i32,
}

impl Default for MapGeometry {
    fn default() -> Self {
        Self {
            map_size: MAP_SIZE,
            origin: ORIGIN,
            offset_x: OFFSET_X,
            offset_z: OFFSET_Z,
            grid_spacing: GRID_SPACING,
            image: "assets/ravencounty.png".to_string(),
            min_zoom: -2,
            max_zoom: 4,
            center_zoom: 0,
            goto_zoom: 2,
        }
    }
}

impl MapGeometry {
    pub fn to_game_coord(&self, point: MapPoint) -> GameCoord {
        to_game_coord(point, self.origin, self.offset_x, self.offset_z)
    }

    pub fn to_map_point(&self, coord: GameCoord) -> MapPoint {
        to_map_point(coord, self.origin, self.offset_x, self.offset_z)
    }

    /// Pixel position of block `(0, 0)`.
    pub fn center(&self) -> MapPoint {
        MapPoint::new(self.origin, self.origin)
    }

    /// Pixel offsets of grid lines, every `spacing` blocks from `-origin` to
    /// `+origin`. Each offset is used both as a vertical and a horizontal line.
    pub fn grid_lines(&self, spacing: f64) -> Vec<f64> {
        if spacing <= 0.0 {
            return Vec::new();
        }
        let mut lines = Vec::new();
        let mut i = -self.origin;
        while i <= self.origin {
            lines.push(i + self.origin);
            i += spacing;
        }
        lines
    }
}
