//! `RavenMapViewer`: the primary wasm-bindgen export.
//!
//! ## JavaScript usage
//!
//! ```js
//! import init, { RavenMapViewer } from './pkg/ravenmap_wasm.js';
//!
//! await init();
//!
//! const viewer = new RavenMapViewer('', null);
//!
//! viewer.onDrawMarker((layerId, lat, lng, kind, label, color, radius) => {
//!   layers[layerId] = L.circleMarker([lat, lng], { color, radius }).bindPopup(label).addTo(map);
//! });
//! viewer.onInputRequest((what, lat, lng) => openDialog(what));
//! viewer.onNotify(msg => alert(msg));
//!
//! map.on('click', e => viewer.click(e.latlng.lat, e.latlng.lng));
//! map.on('mousemove', e => readout.textContent = viewer.coordReadout(e.latlng.lat, e.latlng.lng));
//!
//! // Public data arrives asynchronously; poll picks it up.
//! function tick() {
//!   viewer.poll();
//!   requestAnimationFrame(tick);
//! }
//! tick();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future;
use ravenmap::{
    AnnotationKind, AnnotationMatcher, Capability, ClickOutcome, MapPoint, MarkerKind,
    ResourceSource, Viewer, ViewerConfig, ViewerError,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::events::{CallbackArg, CallbackSlot, UiEvent};
use crate::fetch::FetchSource;
use crate::storage::BrowserStorage;

// ---------------------------------------------------------------------------
// RavenMapViewer
// ---------------------------------------------------------------------------

/// Primary Wasm API object.
///
/// Instantiate with `new RavenMapViewer(baseUrl, configToml)`, register the
/// draw callbacks, then call `viewer.poll()` each animation frame.
#[wasm_bindgen]
pub struct RavenMapViewer {
    viewer: Rc<RefCell<Viewer<BrowserStorage>>>,
    source: FetchSource,
    callbacks: HashMap<CallbackSlot, js_sys::Function>,
}

#[wasm_bindgen]
impl RavenMapViewer {
    // -----------------------------------------------------------------------
    // Constructor
    // -----------------------------------------------------------------------

    /// Create the viewer, load private annotations from `localStorage` and
    /// start fetching the public ones.
    ///
    /// @param baseUrl    - prefix for `publicMarkers.json` / `publicTowns.json`
    /// @param configToml - optional TOML overriding the built-in defaults
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: &str, config_toml: Option<String>) -> Result<RavenMapViewer, JsValue> {
        let config = match config_toml {
            Some(toml) => ViewerConfig::from_toml_str(&toml).map_err(to_js)?,
            None => ViewerConfig::default(),
        };
        let viewer = Viewer::new(config, BrowserStorage::open());

        let client = Self {
            viewer: Rc::new(RefCell::new(viewer)),
            source: FetchSource::new(base_url),
            callbacks: HashMap::new(),
        };
        client.load_public();
        Ok(client)
    }

    // -----------------------------------------------------------------------
    // poll(): call each animation frame
    // -----------------------------------------------------------------------

    /// Drain queued drawing work and fire registered callbacks.
    ///
    /// Actions flush on their own; `poll` is needed for public data that
    /// arrives after a fetch completes.
    #[wasm_bindgen]
    pub fn poll(&self) {
        let commands = self.viewer.borrow_mut().drain_render_commands();
        for cmd in commands {
            self.fire(UiEvent::from(cmd));
        }
    }

    // -----------------------------------------------------------------------
    // Callback registration
    // -----------------------------------------------------------------------

    /// `callback(layerId, lat, lng, kind, label, color, radius)`
    #[wasm_bindgen(js_name = onDrawMarker)]
    pub fn on_draw_marker(&mut self, cb: js_sys::Function) {
        self.callbacks.insert(CallbackSlot::DrawMarker, cb);
    }

    /// `callback(layerId, lat, lng, text)`
    #[wasm_bindgen(js_name = onDrawLabel)]
    pub fn on_draw_label(&mut self, cb: js_sys::Function) {
        self.callbacks.insert(CallbackSlot::DrawLabel, cb);
    }

    /// `callback(spacing: number, lines: number[])`
    #[wasm_bindgen(js_name = onDrawGrid)]
    pub fn on_draw_grid(&mut self, cb: js_sys::Function) {
        self.callbacks.insert(CallbackSlot::DrawGrid, cb);
    }

    /// `callback(lat, lng, text)`
    #[wasm_bindgen(js_name = onDrawPin)]
    pub fn on_draw_pin(&mut self, cb: js_sys::Function) {
        self.callbacks.insert(CallbackSlot::DrawPin, cb);
    }

    /// `callback(lat, lng, zoom)`
    #[wasm_bindgen(js_name = onSetView)]
    pub fn on_set_view(&mut self, cb: js_sys::Function) {
        self.callbacks.insert(CallbackSlot::SetView, cb);
    }

    /// `callback(layerId)`: `"annotation-N"`, `"grid"` or `"pin"`
    #[wasm_bindgen(js_name = onRemoveLayer)]
    pub fn on_remove_layer(&mut self, cb: js_sys::Function) {
        self.callbacks.insert(CallbackSlot::RemoveLayer, cb);
    }

    /// `callback(message: string)`
    #[wasm_bindgen(js_name = onNotify)]
    pub fn on_notify(&mut self, cb: js_sys::Function) {
        self.callbacks.insert(CallbackSlot::Notify, cb);
    }

    /// `callback()`: drop every overlay layer
    #[wasm_bindgen(js_name = onClear)]
    pub fn on_clear(&mut self, cb: js_sys::Function) {
        self.callbacks.insert(CallbackSlot::Clear, cb);
    }

    /// `callback(what: "marker" | "town", lat, lng)`
    ///
    /// Answer with `submitMarkerDetails` / `submitTownName`, or
    /// `dismissInput` if the user backs out.
    #[wasm_bindgen(js_name = onInputRequest)]
    pub fn on_input_request(&mut self, cb: js_sys::Function) {
        self.callbacks.insert(CallbackSlot::InputRequest, cb);
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Log in. Unknown credentials give a `"player"` session.
    ///
    /// Returns the role name.
    #[wasm_bindgen]
    pub fn login(&self, username: &str, password: &str) -> String {
        let session = self.viewer.borrow_mut().login(username, password);
        self.poll();
        session.role.to_string()
    }

    /// Full reset, then re-fetch public data.
    #[wasm_bindgen]
    pub fn logout(&self) {
        self.viewer.borrow_mut().logout();
        self.poll();
        self.load_public();
    }

    #[wasm_bindgen(getter)]
    pub fn username(&self) -> Option<String> {
        self.viewer.borrow().session().map(|s| s.username.clone())
    }

    #[wasm_bindgen(getter)]
    pub fn role(&self) -> Option<String> {
        self.viewer.borrow().session().map(|s| s.role.to_string())
    }

    /// Whether the admin/mod controls (town placement) should be shown.
    #[wasm_bindgen(js_name = canPlaceTown)]
    pub fn can_place_town(&self) -> bool {
        self.viewer.borrow().can(Capability::PlaceTown)
    }

    /// `kind` is `"markers"` or `"towns"`.
    #[wasm_bindgen(js_name = canExport)]
    pub fn can_export(&self, kind: &str) -> bool {
        let capability = match parse_annotation_kind(kind) {
            Ok(AnnotationKind::Markers) => Capability::ExportPublicMarkers,
            Ok(AnnotationKind::Towns) => Capability::ExportPublicTowns,
            Err(_) => return false,
        };
        self.viewer.borrow().can(capability)
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    #[wasm_bindgen(js_name = startMarkerPlacement)]
    pub fn start_marker_placement(&self) -> Result<(), JsValue> {
        let result = self.viewer.borrow_mut().start_marker_placement();
        self.poll();
        result.map_err(to_js)
    }

    #[wasm_bindgen(js_name = startTownPlacement)]
    pub fn start_town_placement(&self) -> Result<(), JsValue> {
        let result = self.viewer.borrow_mut().start_town_placement();
        self.poll();
        result.map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn cancel(&self) -> bool {
        self.viewer.borrow_mut().cancel()
    }

    /// Left click on the map at image coordinates.
    #[wasm_bindgen]
    pub fn click(&self, lat: f64, lng: f64) {
        let outcome = self.viewer.borrow_mut().click(MapPoint::new(lat, lng));
        self.poll();
        if let ClickOutcome::InputRequested(req) = outcome {
            self.fire(UiEvent::from(req));
        }
    }

    /// Answer a marker prompt. On an invalid kind or empty label the error
    /// message is thrown and `onInputRequest` fires again for the same spot.
    #[wasm_bindgen(js_name = submitMarkerDetails)]
    pub fn submit_marker_details(&self, kind: &str, label: &str) -> Result<(), JsValue> {
        let result = self.viewer.borrow_mut().submit_marker_details(kind, label);
        self.answer(result)
    }

    #[wasm_bindgen(js_name = submitTownName)]
    pub fn submit_town_name(&self, name: &str) -> Result<(), JsValue> {
        let result = self.viewer.borrow_mut().submit_town_name(name);
        self.answer(result)
    }

    #[wasm_bindgen(js_name = dismissInput)]
    pub fn dismiss_input(&self) -> bool {
        self.viewer.borrow_mut().dismiss_input()
    }

    // -----------------------------------------------------------------------
    // Editing (by name)
    // -----------------------------------------------------------------------

    /// Returns how many markers were removed.
    #[wasm_bindgen(js_name = removeMarker)]
    pub fn remove_marker(&self, name: &str) -> Result<u32, JsValue> {
        let result = self
            .viewer
            .borrow_mut()
            .remove_marker(&AnnotationMatcher::from(name));
        self.poll();
        result.map(|v| v.len() as u32).map_err(to_js)
    }

    #[wasm_bindgen(js_name = renameMarker)]
    pub fn rename_marker(&self, name: &str, new_label: &str) -> Result<u32, JsValue> {
        let result = self
            .viewer
            .borrow_mut()
            .rename_marker(&AnnotationMatcher::from(name), new_label);
        self.poll();
        result.map(|v| v.len() as u32).map_err(to_js)
    }

    /// Change name and kind of every marker called `name`. An unknown kind
    /// throws and changes nothing.
    #[wasm_bindgen(js_name = editMarker)]
    pub fn edit_marker(&self, name: &str, new_label: &str, kind: &str) -> Result<u32, JsValue> {
        let result = self
            .viewer
            .borrow_mut()
            .edit_marker(&AnnotationMatcher::from(name), new_label, kind);
        self.poll();
        result.map(|v| v.len() as u32).map_err(to_js)
    }

    #[wasm_bindgen(js_name = removeTown)]
    pub fn remove_town(&self, name: &str) -> Result<u32, JsValue> {
        let result = self
            .viewer
            .borrow_mut()
            .remove_town(&AnnotationMatcher::from(name));
        self.poll();
        result.map(|v| v.len() as u32).map_err(to_js)
    }

    #[wasm_bindgen(js_name = renameTown)]
    pub fn rename_town(&self, name: &str, new_name: &str) -> Result<u32, JsValue> {
        let result = self
            .viewer
            .borrow_mut()
            .rename_town(&AnnotationMatcher::from(name), new_name);
        self.poll();
        result.map(|v| v.len() as u32).map_err(to_js)
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Download the public collection (`"markers"` or `"towns"`) as
    /// pretty-printed JSON.
    #[wasm_bindgen(js_name = exportPublic)]
    pub fn export_public(&self, kind: &str) -> Result<(), JsValue> {
        let kind = parse_annotation_kind(kind).map_err(to_js)?;
        let export = self.viewer.borrow().export_public(kind).map_err(to_js)?;
        download(&export.file_name, &export.contents)
    }

    // -----------------------------------------------------------------------
    // Coordinates & view
    // -----------------------------------------------------------------------

    /// `"X: <x> | Z: <z>"` for the pointer position.
    #[wasm_bindgen(js_name = coordReadout)]
    pub fn coord_readout(&self, lat: f64, lng: f64) -> String {
        self.viewer.borrow().coord_readout(MapPoint::new(lat, lng))
    }

    /// Right click: report the block location through `onNotify`.
    #[wasm_bindgen]
    pub fn inspect(&self, lat: f64, lng: f64) {
        self.viewer.borrow_mut().inspect(MapPoint::new(lat, lng));
        self.poll();
    }

    /// Jump to `"X Z"` block coordinates.
    #[wasm_bindgen(js_name = goTo)]
    pub fn go_to(&self, input: &str) -> Result<(), JsValue> {
        let result = self.viewer.borrow_mut().go_to(input);
        self.poll();
        result.map(|_| ()).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn center(&self) {
        self.viewer.borrow_mut().center();
        self.poll();
    }

    /// Returns the new grid visibility.
    #[wasm_bindgen(js_name = toggleGrid)]
    pub fn toggle_grid(&self) -> bool {
        let visible = self.viewer.borrow_mut().toggle_grid();
        self.poll();
        visible
    }

    // -----------------------------------------------------------------------
    // Map geometry queries
    // -----------------------------------------------------------------------

    /// False when `localStorage` is unusable and private annotations only
    /// last for this page view.
    #[wasm_bindgen(js_name = persistsPrivate)]
    pub fn persists_private(&self) -> bool {
        self.viewer.borrow().store().storage().is_available()
    }

    #[wasm_bindgen(js_name = mapSize)]
    pub fn map_size(&self) -> f64 {
        self.viewer.borrow().config().map.map_size
    }

    #[wasm_bindgen(js_name = imageUrl)]
    pub fn image_url(&self) -> String {
        self.viewer.borrow().config().map.image.clone()
    }

    #[wasm_bindgen(js_name = minZoom)]
    pub fn min_zoom(&self) -> i32 {
        self.viewer.borrow().config().map.min_zoom
    }

    #[wasm_bindgen(js_name = maxZoom)]
    pub fn max_zoom(&self) -> i32 {
        self.viewer.borrow().config().map.max_zoom
    }

    /// Marker kind names for a picker.
    #[wasm_bindgen(js_name = markerKinds)]
    pub fn marker_kinds() -> js_sys::Array {
        MarkerKind::ALL
            .iter()
            .map(|k| JsValue::from_str(k.as_str()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

impl RavenMapViewer {
    /// Fetch both public resources without holding the viewer borrow across
    /// the await; results are drawn on the next `poll`.
    fn load_public(&self) {
        let (markers_name, towns_name) = {
            let viewer = self.viewer.borrow();
            let resources = &viewer.config().resources;
            (
                resources.public_resource(AnnotationKind::Markers).to_string(),
                resources.public_resource(AnnotationKind::Towns).to_string(),
            )
        };
        let viewer = Rc::clone(&self.viewer);
        let source = self.source.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let (markers, towns) =
                future::join(source.fetch(&markers_name), source.fetch(&towns_name)).await;

            let mut viewer = viewer.borrow_mut();
            let added = viewer.apply_public_resource(AnnotationKind::Markers, markers)
                + viewer.apply_public_resource(AnnotationKind::Towns, towns);
            log::info!("[client] Loaded {} public annotations", added);
        });
    }

    /// Flush, then re-issue the pending prompt if the answer was bad input.
    fn answer<T>(&self, result: ravenmap::Result<T>) -> Result<(), JsValue> {
        self.poll();
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.is_retryable_input() {
                    let pending = self.viewer.borrow().pending_input();
                    if let Some(req) = pending {
                        self.fire(UiEvent::from(req));
                    }
                }
                Err(to_js(e))
            }
        }
    }

    fn fire(&self, event: UiEvent) {
        let args: Vec<JsValue> = event.args.into_iter().map(to_js_value).collect();
        call_fn(self.callbacks.get(&event.slot), &args);
    }
}

fn parse_annotation_kind(kind: &str) -> Result<AnnotationKind, ViewerError> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "markers" | "marker" => Ok(AnnotationKind::Markers),
        "towns" | "town" => Ok(AnnotationKind::Towns),
        other => Err(ViewerError::MalformedInput(format!(
            "unknown annotation kind '{}'",
            other
        ))),
    }
}

fn to_js(e: ViewerError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js_value(arg: CallbackArg) -> JsValue {
    match arg {
        CallbackArg::Str(s) => JsValue::from_str(&s),
        CallbackArg::Num(n) => JsValue::from(n),
        CallbackArg::NumList(ns) => ns
            .into_iter()
            .map(JsValue::from)
            .collect::<js_sys::Array>()
            .into(),
    }
}

/// Offer `contents` as a file download via a temporary object URL.
fn download(file_name: &str, contents: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let parts = js_sys::Array::of1(&JsValue::from_str(contents));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type("application/json");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let anchor: web_sys::HtmlAnchorElement = document
        .create_element("a")?
        .dyn_into()
        .map_err(JsValue::from)?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    anchor.click();

    web_sys::Url::revoke_object_url(&url)?;
    log::info!("[client] Exported {}", file_name);
    Ok(())
}

// ---------------------------------------------------------------------------
// JS callback helper
// ---------------------------------------------------------------------------

fn call_fn(f: Option<&js_sys::Function>, args: &[JsValue]) {
    if let Some(func) = f {
        let this = JsValue::NULL;
        let arr = js_sys::Array::new();
        for a in args {
            arr.push(a);
        }
        if let Err(e) = func.apply(&this, &arr) {
            log::warn!("[client] Callback error: {:?}", e);
        }
    }
}
