//! Placement controller – the single-active-mode click state machine.
//!
//! ```text
//!            start_marker_placement                click
//!   Idle ───────────────────────────▶ PlacingMarker ─────▶ AwaitingMarkerDetails ─┐
//!    │ ▲     start_town_placement                  click                          │ submit / dismiss
//!    │ ├────────────────────────────▶ PlacingTown  ─────▶ AwaitingTownName ───────┤
//!    │ │                                                                          │
//!    │ └──────────────────────────────────────────────────────────────────────────┘
//!    │ click                 click
//!    └──────▶ Measuring(1) ───────▶ Idle  (distance reported)
//! ```
//!
//! Starting a mode cancels whatever was pending. `cancel` returns to `Idle`
//! from anywhere.

use crate::coords;
use crate::error::{Result, ViewerError};
use crate::session::{self, Capability, RolePolicy, Session};
use crate::types::{MapPoint, MarkerKind};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementMode {
    Idle,
    PlacingMarker,
    PlacingTown,
    AwaitingMarkerDetails { position: MapPoint },
    AwaitingTownName { position: MapPoint },
    Measuring { first: MapPoint },
}

/// Input the UI must collect before a placement can complete.
#[derive(Debug, Clone, PartialEq)]
pub enum InputRequest {
    MarkerDetails { position: MapPoint },
    TownName { position: MapPoint },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub from: MapPoint,
    pub to: MapPoint,
    pub dx: i64,
    pub dz: i64,
    pub distance: f64,
}

impl Measurement {
    pub fn between(from: MapPoint, to: MapPoint) -> Self {
        let (dx, dz) = coords::block_delta(from, to);
        Self {
            from,
            to,
            dx,
            dz,
            distance: coords::block_distance(from, to),
        }
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Distance: {:.2} blocks (ΔX: {}, ΔZ: {})",
            self.distance, self.dx, self.dz
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    InputRequested(InputRequest),
    MeasureStarted(MapPoint),
    Measured(Measurement),
    /// An input request is outstanding; the click is dropped.
    Ignored,
}

/// A validated marker ready for the annotation store.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDraft {
    pub position: MapPoint,
    pub kind: MarkerKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TownDraft {
    pub position: MapPoint,
    pub name: String,
}

fn non_empty(input: &str, what: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ViewerError::MalformedInput(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// PlacementController
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PlacementController {
    mode: PlacementMode,
}

impl Default for PlacementController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementController {
    pub fn new() -> Self {
        Self {
            mode: PlacementMode::Idle,
        }
    }

    pub fn mode(&self) -> &PlacementMode {
        &self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == PlacementMode::Idle
    }

    /// Outstanding input request, if a placement is waiting on the UI.
    pub fn pending_input(&self) -> Option<InputRequest> {
        match self.mode {
            PlacementMode::AwaitingMarkerDetails { position } => {
                Some(InputRequest::MarkerDetails { position })
            }
            PlacementMode::AwaitingTownName { position } => {
                Some(InputRequest::TownName { position })
            }
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Mode entry
    // -----------------------------------------------------------------------

    /// Arm marker placement. Requires a session of any role.
    pub fn start_marker_placement(
        &mut self,
        policy: &RolePolicy,
        session: Option<&Session>,
    ) -> Result<()> {
        session::require(policy, Capability::PlaceMarker, session)?;
        self.enter(PlacementMode::PlacingMarker);
        Ok(())
    }

    /// Arm town placement. Requires the `PlaceTown` capability.
    pub fn start_town_placement(
        &mut self,
        policy: &RolePolicy,
        session: Option<&Session>,
    ) -> Result<()> {
        if !session::can(policy, Capability::PlaceTown, session) {
            return Err(ViewerError::Permission {
                capability: Capability::PlaceTown,
            });
        }
        self.enter(PlacementMode::PlacingTown);
        Ok(())
    }

    /// Back to `Idle`. Returns true if anything was pending.
    pub fn cancel(&mut self) -> bool {
        let was_pending = !self.is_idle();
        if was_pending {
            debug!("Cancelled {:?}", self.mode);
        }
        self.mode = PlacementMode::Idle;
        was_pending
    }

    fn enter(&mut self, mode: PlacementMode) {
        if !self.is_idle() {
            debug!("{:?} superseded by {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    // -----------------------------------------------------------------------
    // Clicks
    // -----------------------------------------------------------------------

    pub fn on_click(&mut self, point: MapPoint) -> ClickOutcome {
        match self.mode.clone() {
            PlacementMode::PlacingMarker => {
                self.mode = PlacementMode::AwaitingMarkerDetails { position: point };
                ClickOutcome::InputRequested(InputRequest::MarkerDetails { position: point })
            }
            PlacementMode::PlacingTown => {
                self.mode = PlacementMode::AwaitingTownName { position: point };
                ClickOutcome::InputRequested(InputRequest::TownName { position: point })
            }
            PlacementMode::AwaitingMarkerDetails { .. } | PlacementMode::AwaitingTownName { .. } => {
                ClickOutcome::Ignored
            }
            PlacementMode::Idle => {
                self.mode = PlacementMode::Measuring { first: point };
                ClickOutcome::MeasureStarted(point)
            }
            PlacementMode::Measuring { first } => {
                self.mode = PlacementMode::Idle;
                ClickOutcome::Measured(Measurement::between(first, point))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Input responses
    // -----------------------------------------------------------------------

    /// Answer a marker-details request. On invalid input the request stays
    /// pending so the UI can ask again.
    pub fn submit_marker_details(&mut self, kind: &str, label: &str) -> Result<MarkerDraft> {
        let PlacementMode::AwaitingMarkerDetails { position } = self.mode else {
            return Err(ViewerError::MalformedInput(
                "no marker placement is waiting for details".to_string(),
            ));
        };
        let kind: MarkerKind = kind.parse()?;
        let label = non_empty(label, "marker name")?;

        self.mode = PlacementMode::Idle;
        Ok(MarkerDraft {
            position,
            kind,
            label,
        })
    }

    pub fn submit_town_name(&mut self, name: &str) -> Result<TownDraft> {
        let PlacementMode::AwaitingTownName { position } = self.mode else {
            return Err(ViewerError::MalformedInput(
                "no town placement is waiting for a name".to_string(),
            ));
        };
        let name = non_empty(name, "town name")?;

        self.mode = PlacementMode::Idle;
        Ok(TownDraft { position, name })
    }

    /// The user closed the prompt without answering: drop the placement.
    pub fn dismiss_input(&mut self) -> bool {
        if self.pending_input().is_some() {
            self.mode = PlacementMode::Idle;
            true
        } else {
            false
        }
    }
}
