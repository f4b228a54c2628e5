//! Viewer – the application state object.
//!
//! Owns configuration, the annotation store, the placement controller and
//! the single session slot. Every UI event lands here; the resulting drawing
//! work is queued as [`RenderCommand`]s for the front end to drain.
//!
//! ```text
//! Viewer
//!   ├── ViewerConfig         (config.rs)
//!   ├── AnnotationStore<S>   (store.rs)   ← write-through to S
//!   ├── PlacementController  (placement.rs)
//!   ├── Option<Session>      (session.rs)
//!   └── Vec<RenderCommand>   (render.rs)  → drained by the front end
//! ```

use crate::config::ViewerConfig;
use crate::coords;
use crate::error::{Result, ViewerError};
use crate::placement::{ClickOutcome, InputRequest, PlacementController, PlacementMode};
use crate::render::{LayerId, MarkerStyle, RenderCommand};
use crate::session::{self, Capability, Session};
use crate::source::ResourceSource;
use crate::storage::KeyValueStore;
use crate::store::AnnotationStore;
use crate::types::{
    AnnotationKind, AnnotationMatcher, GameCoord, MapPoint, Marker, Scope, TownLabel,
};
use futures::future;
use log::{debug, info};

/// A pretty-printed public collection, ready to be offered as a download.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicExport {
    pub file_name: String,
    pub contents: String,
}

pub struct Viewer<S: KeyValueStore> {
    config: ViewerConfig,
    store: AnnotationStore<S>,
    placement: PlacementController,
    session: Option<Session>,
    grid_visible: bool,
    pending: Vec<RenderCommand>,
}

impl<S: KeyValueStore> Viewer<S> {
    /// Build the viewer and load private annotations from `storage`.
    ///
    /// Public collections start empty; feed them with
    /// [`Viewer::apply_public_resource`] or [`Viewer::load_public`].
    pub fn new(config: ViewerConfig, storage: S) -> Self {
        let store = AnnotationStore::new(storage, config.resources.clone());
        let mut viewer = Self {
            config,
            store,
            placement: PlacementController::new(),
            session: None,
            grid_visible: false,
            pending: Vec::new(),
        };
        viewer.center();
        viewer.draw_private();
        viewer
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore<S> {
        &self.store
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn mode(&self) -> &PlacementMode {
        self.placement.mode()
    }

    pub fn pending_input(&self) -> Option<InputRequest> {
        self.placement.pending_input()
    }

    pub fn grid_visible(&self) -> bool {
        self.grid_visible
    }

    pub fn can(&self, capability: Capability) -> bool {
        session::can(&self.config.policy, capability, self.session.as_ref())
    }

    /// Take every queued render command.
    pub fn drain_render_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.pending)
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Resolve credentials and replace the current session. Unknown
    /// credentials produce a `player` session; login never fails.
    pub fn login(&mut self, username: &str, password: &str) -> Session {
        let session = session::login(&self.config.credentials, username, password);
        self.placement.cancel();
        info!("Logged in as {}", session);
        self.session = Some(session.clone());
        session
    }

    /// Full reset: no session, no pending placement, public collections
    /// dropped (the front end re-fetches them), private reloaded from storage.
    pub fn logout(&mut self) {
        if let Some(s) = self.session.take() {
            info!("Logged out {}", s.username);
        }
        self.placement.cancel();
        self.store.reset();
        self.grid_visible = false;

        self.pending.clear();
        self.pending.push(RenderCommand::Clear);
        self.center();
        self.draw_private();
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    pub fn start_marker_placement(&mut self) -> Result<()> {
        self.placement
            .start_marker_placement(&self.config.policy, self.session.as_ref())?;
        self.notify("Click map to place marker.");
        Ok(())
    }

    pub fn start_town_placement(&mut self) -> Result<()> {
        self.placement
            .start_town_placement(&self.config.policy, self.session.as_ref())?;
        self.notify("Click map to place town label.");
        Ok(())
    }

    /// Drop any pending placement or half-finished measurement.
    pub fn cancel(&mut self) -> bool {
        self.placement.cancel()
    }

    /// Plain left click on the map.
    pub fn click(&mut self, point: MapPoint) -> ClickOutcome {
        let outcome = self.placement.on_click(point);
        if let ClickOutcome::Measured(m) = &outcome {
            let message = m.to_string();
            self.notify(&message);
        }
        outcome
    }

    /// Complete a marker placement. Privileged roles publish, everyone else
    /// keeps the marker private.
    pub fn submit_marker_details(&mut self, kind: &str, label: &str) -> Result<Marker> {
        let draft = self.placement.submit_marker_details(kind, label)?;
        let scope = if self.can(Capability::PublishMarkers) {
            Scope::Public
        } else {
            Scope::Private
        };

        let marker = self
            .store
            .insert_marker(draft.position, draft.kind, &draft.label, scope)?;
        self.draw_marker(&marker);
        Ok(marker)
    }

    /// Complete a town placement. Towns are public only.
    pub fn submit_town_name(&mut self, name: &str) -> Result<TownLabel> {
        session::require(&self.config.policy, Capability::PlaceTown, self.session.as_ref())?;
        let draft = self.placement.submit_town_name(name)?;

        let town = self.store.add_town(draft.position, &draft.name, Scope::Public)?;
        self.draw_town(&town);
        self.notify("Town added. Export JSON to update server.");
        Ok(town)
    }

    pub fn dismiss_input(&mut self) -> bool {
        self.placement.dismiss_input()
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Scope the current session is limited to when editing, or `None` when
    /// it may edit both collections.
    fn editable_scope(&self, publish: Capability) -> Option<Scope> {
        if self.can(publish) {
            None
        } else {
            Some(Scope::Private)
        }
    }

    /// Delete matching markers. Without `PublishMarkers` only private
    /// markers are touched.
    pub fn remove_marker(&mut self, matcher: &AnnotationMatcher) -> Result<Vec<Marker>> {
        let removed = match self.editable_scope(Capability::PublishMarkers) {
            None => self.store.remove_marker(matcher)?,
            Some(scope) => self.store.remove_marker_in(matcher, scope)?,
        };
        for m in &removed {
            self.pending.push(RenderCommand::RemoveLayer {
                layer: LayerId::Annotation(m.id),
            });
        }
        Ok(removed)
    }

    /// Rename matching markers, keeping their kind.
    pub fn rename_marker(
        &mut self,
        matcher: &AnnotationMatcher,
        new_label: &str,
    ) -> Result<Vec<Marker>> {
        let changed = match self.editable_scope(Capability::PublishMarkers) {
            None => self.store.rename_marker(matcher, new_label)?,
            Some(scope) => self.store.rename_marker_in(matcher, new_label, scope)?,
        };
        self.redraw_markers(&changed);
        Ok(changed)
    }

    /// Change label and kind of matching markers. An unknown kind is
    /// rejected with `InvalidKind` before anything changes.
    pub fn edit_marker(
        &mut self,
        matcher: &AnnotationMatcher,
        new_label: &str,
        kind: &str,
    ) -> Result<Vec<Marker>> {
        let changed = match self.editable_scope(Capability::PublishMarkers) {
            None => self.store.edit_marker(matcher, new_label, kind)?,
            Some(scope) => self.store.edit_marker_in(matcher, new_label, kind, scope)?,
        };
        self.redraw_markers(&changed);
        Ok(changed)
    }

    pub fn remove_town(&mut self, matcher: &AnnotationMatcher) -> Result<Vec<TownLabel>> {
        let removed = match self.editable_scope(Capability::PlaceTown) {
            None => self.store.remove_town(matcher)?,
            Some(scope) => self.store.remove_town_in(matcher, scope)?,
        };
        for t in &removed {
            self.pending.push(RenderCommand::RemoveLayer {
                layer: LayerId::Annotation(t.id),
            });
        }
        Ok(removed)
    }

    pub fn rename_town(
        &mut self,
        matcher: &AnnotationMatcher,
        new_name: &str,
    ) -> Result<Vec<TownLabel>> {
        let changed = match self.editable_scope(Capability::PlaceTown) {
            None => self.store.rename_town(matcher, new_name)?,
            Some(scope) => self.store.rename_town_in(matcher, new_name, scope)?,
        };
        for t in &changed {
            self.pending.push(RenderCommand::RemoveLayer {
                layer: LayerId::Annotation(t.id),
            });
            self.draw_town(t);
        }
        Ok(changed)
    }

    // -----------------------------------------------------------------------
    // Public data
    // -----------------------------------------------------------------------

    /// Snapshot a public collection for download.
    pub fn export_public(&self, kind: AnnotationKind) -> Result<PublicExport> {
        let capability = match kind {
            AnnotationKind::Markers => Capability::ExportPublicMarkers,
            AnnotationKind::Towns => Capability::ExportPublicTowns,
        };
        if !self.can(capability) {
            return Err(ViewerError::Permission { capability });
        }

        Ok(PublicExport {
            file_name: self.config.resources.public_resource(kind).to_string(),
            contents: self.store.export_public(kind)?,
        })
    }

    /// Apply the outcome of a public resource fetch. Failures mean "no data"
    /// and are only logged. Returns the number of annotations added.
    pub fn apply_public_resource(&mut self, kind: AnnotationKind, fetched: Result<String>) -> usize {
        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                info!("No public {} available: {}", kind, e);
                return 0;
            }
        };

        match kind {
            AnnotationKind::Markers => {
                let added = self.store.apply_public_markers(&body);
                added.iter().for_each(|m| self.draw_marker(m));
                added.len()
            }
            AnnotationKind::Towns => {
                let added = self.store.apply_public_towns(&body);
                added.iter().for_each(|t| self.draw_town(t));
                added.len()
            }
        }
    }

    /// Fetch both public resources concurrently and apply them.
    pub async fn load_public<R: ResourceSource + ?Sized>(&mut self, source: &R) -> usize {
        let markers_name = self
            .config
            .resources
            .public_resource(AnnotationKind::Markers)
            .to_string();
        let towns_name = self
            .config
            .resources
            .public_resource(AnnotationKind::Towns)
            .to_string();

        let (markers, towns) =
            future::join(source.fetch(&markers_name), source.fetch(&towns_name)).await;

        self.apply_public_resource(AnnotationKind::Markers, markers)
            + self.apply_public_resource(AnnotationKind::Towns, towns)
    }

    // -----------------------------------------------------------------------
    // Coordinates & view
    // -----------------------------------------------------------------------

    pub fn hover(&self, point: MapPoint) -> GameCoord {
        self.config.map.to_game_coord(point)
    }

    /// Readout shown while the pointer moves over the map.
    pub fn coord_readout(&self, point: MapPoint) -> String {
        self.hover(point).to_string()
    }

    /// Right click: report the block under the pointer.
    pub fn inspect(&mut self, point: MapPoint) -> GameCoord {
        let coord = self.config.map.to_game_coord(point);
        self.notify(&format!("Block Location: X: {} Z: {}", coord.x, coord.z));
        coord
    }

    /// Jump to user-entered `"X Z"` block coordinates and drop a pin there.
    pub fn go_to(&mut self, input: &str) -> Result<MapPoint> {
        let coord = coords::parse_coord_input(input)?;
        let position = self.config.map.to_map_point(coord);
        debug!("Go to {} → {}", coord, position);

        self.pending.push(RenderCommand::RemoveLayer {
            layer: LayerId::Pin,
        });
        self.pending.push(RenderCommand::SetView {
            position,
            zoom: self.config.map.goto_zoom,
        });
        self.pending.push(RenderCommand::DrawPin {
            position,
            text: format!("X: {} Z: {}", coord.x, coord.z),
        });
        Ok(position)
    }

    pub fn center(&mut self) {
        self.pending.push(RenderCommand::SetView {
            position: self.config.map.center(),
            zoom: self.config.map.center_zoom,
        });
    }

    /// Show or hide the block grid. Returns the new visibility.
    pub fn toggle_grid(&mut self) -> bool {
        if self.grid_visible {
            self.pending.push(RenderCommand::RemoveLayer {
                layer: LayerId::Grid,
            });
        } else {
            let spacing = self.config.map.grid_spacing;
            self.pending.push(RenderCommand::DrawGrid {
                spacing,
                lines: self.config.map.grid_lines(spacing),
            });
        }
        self.grid_visible = !self.grid_visible;
        self.grid_visible
    }

    // -----------------------------------------------------------------------
    // Drawing helpers
    // -----------------------------------------------------------------------

    fn notify(&mut self, message: &str) {
        self.pending.push(RenderCommand::Notify {
            message: message.to_string(),
        });
    }

    fn draw_marker(&mut self, marker: &Marker) {
        self.pending.push(RenderCommand::DrawMarker {
            layer: LayerId::Annotation(marker.id),
            position: marker.position,
            style: MarkerStyle::from(marker.kind),
            kind: marker.kind,
            label: marker.label.clone(),
        });
    }

    fn redraw_markers(&mut self, markers: &[Marker]) {
        for m in markers {
            self.pending.push(RenderCommand::RemoveLayer {
                layer: LayerId::Annotation(m.id),
            });
            self.draw_marker(m);
        }
    }

    fn draw_town(&mut self, town: &TownLabel) {
        self.pending.push(RenderCommand::DrawLabel {
            layer: LayerId::Annotation(town.id),
            position: town.position,
            text: town.name.clone(),
        });
    }

    fn draw_private(&mut self) {
        let markers = self.store.private_markers().to_vec();
        let towns = self.store.private_towns().to_vec();
        markers.iter().for_each(|m| self.draw_marker(m));
        towns.iter().for_each(|t| self.draw_town(t));
    }
}
