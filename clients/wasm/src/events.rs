//! Mapping from viewer output to JS callback invocations.
//!
//! Everything here is plain Rust so the mapping can be unit-tested on the
//! host; `client.rs` turns each [`CallbackArg`] into a `JsValue` at the
//! last moment.
//!
//! | Callback          | Arguments                                              |
//! |-------------------|--------------------------------------------------------|
//! | `onDrawMarker`    | `layerId, lat, lng, kind, label, color, radius`        |
//! | `onDrawLabel`     | `layerId, lat, lng, text`                              |
//! | `onDrawGrid`      | `spacing, lines: number[]`                             |
//! | `onDrawPin`       | `lat, lng, text`                                       |
//! | `onSetView`       | `lat, lng, zoom`                                       |
//! | `onRemoveLayer`   | `layerId`                                              |
//! | `onNotify`        | `message`                                              |
//! | `onClear`         | none                                                    |
//! | `onInputRequest`  | `"marker" \| "town", lat, lng`                         |

use ravenmap::{InputRequest, MapPoint, RenderCommand};

/// Which registered JS callback an event goes to.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum CallbackSlot {
    DrawMarker,
    DrawLabel,
    DrawGrid,
    DrawPin,
    SetView,
    RemoveLayer,
    Notify,
    Clear,
    InputRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackArg {
    Str(String),
    Num(f64),
    NumList(Vec<f64>),
}

impl From<&str> for CallbackArg {
    fn from(s: &str) -> Self {
        CallbackArg::Str(s.to_string())
    }
}

impl From<String> for CallbackArg {
    fn from(s: String) -> Self {
        CallbackArg::Str(s)
    }
}

impl From<f64> for CallbackArg {
    fn from(n: f64) -> Self {
        CallbackArg::Num(n)
    }
}

/// A single pending JS callback invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct UiEvent {
    pub slot: CallbackSlot,
    pub args: Vec<CallbackArg>,
}

impl UiEvent {
    fn new(slot: CallbackSlot, args: Vec<CallbackArg>) -> Self {
        Self { slot, args }
    }
}

fn point_args(p: MapPoint) -> [CallbackArg; 2] {
    [CallbackArg::Num(p.lat_y), CallbackArg::Num(p.lng_x)]
}

impl From<RenderCommand> for UiEvent {
    fn from(cmd: RenderCommand) -> Self {
        match cmd {
            RenderCommand::DrawMarker {
                layer,
                position,
                style,
                kind,
                label,
            } => {
                let [lat, lng] = point_args(position);
                UiEvent::new(
                    CallbackSlot::DrawMarker,
                    vec![
                        layer.to_string().into(),
                        lat,
                        lng,
                        kind.as_str().into(),
                        label.into(),
                        style.color.into(),
                        style.radius.into(),
                    ],
                )
            }
            RenderCommand::DrawLabel {
                layer,
                position,
                text,
            } => {
                let [lat, lng] = point_args(position);
                UiEvent::new(
                    CallbackSlot::DrawLabel,
                    vec![layer.to_string().into(), lat, lng, text.into()],
                )
            }
            RenderCommand::DrawGrid { spacing, lines } => UiEvent::new(
                CallbackSlot::DrawGrid,
                vec![spacing.into(), CallbackArg::NumList(lines)],
            ),
            RenderCommand::DrawPin { position, text } => {
                let [lat, lng] = point_args(position);
                UiEvent::new(CallbackSlot::DrawPin, vec![lat, lng, text.into()])
            }
            RenderCommand::SetView { position, zoom } => {
                let [lat, lng] = point_args(position);
                UiEvent::new(CallbackSlot::SetView, vec![lat, lng, f64::from(zoom).into()])
            }
            RenderCommand::RemoveLayer { layer } => {
                UiEvent::new(CallbackSlot::RemoveLayer, vec![layer.to_string().into()])
            }
            RenderCommand::Notify { message } => {
                UiEvent::new(CallbackSlot::Notify, vec![message.into()])
            }
            RenderCommand::Clear => UiEvent::new(CallbackSlot::Clear, Vec::new()),
        }
    }
}

impl From<InputRequest> for UiEvent {
    fn from(req: InputRequest) -> Self {
        let (what, position) = match req {
            InputRequest::MarkerDetails { position } => ("marker", position),
            InputRequest::TownName { position } => ("town", position),
        };
        let [lat, lng] = point_args(position);
        UiEvent::new(CallbackSlot::InputRequest, vec![what.into(), lat, lng])
    }
}
