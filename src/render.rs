//! Drawing commands handed to the renderer.
//!
//! The viewer never touches the DOM. It queues [`RenderCommand`]s which the
//! front end drains once per frame and replays against its map surface.

use crate::types::{AnnotationId, MapPoint, MarkerKind};

/// Circle radius of marker dots, in pixels.
pub const MARKER_RADIUS: f64 = 8.0;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum LayerId {
    Annotation(AnnotationId),
    Grid,
    /// The temporary pin dropped by "go to coordinates".
    Pin,
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerId::Annotation(id) => write!(f, "annotation-{}", id.0),
            LayerId::Grid => f.write_str("grid"),
            LayerId::Pin => f.write_str("pin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub radius: f64,
}

impl From<MarkerKind> for MarkerStyle {
    fn from(kind: MarkerKind) -> Self {
        Self {
            color: kind.color(),
            radius: MARKER_RADIUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    DrawMarker {
        layer: LayerId,
        position: MapPoint,
        style: MarkerStyle,
        kind: MarkerKind,
        label: String,
    },
    DrawLabel {
        layer: LayerId,
        position: MapPoint,
        text: String,
    },
    /// `lines` are pixel offsets; each is drawn vertically and horizontally
    /// across the whole image.
    DrawGrid {
        spacing: f64,
        lines: Vec<f64>,
    },
    DrawPin {
        position: MapPoint,
        text: String,
    },
    SetView {
        position: MapPoint,
        zoom: i32,
    },
    RemoveLayer {
        layer: LayerId,
    },
    /// A message for the user (measurement result, block location, ...).
    Notify {
        message: String,
    },
    /// Drop every layer except the base image.
    Clear,
}
