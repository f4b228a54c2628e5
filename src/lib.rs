//! Raven County map viewer core.
//!
//! Converts between image pixels and game blocks, keeps public and private
//! annotations, runs the click placement state machine and gates actions by
//! role. Rendering and browser plumbing live in `clients/wasm`.
//!
//! ## Architecture
//!
//! ```text
//! Viewer  (viewer.rs)                 ← application state, render queue
//!   ├── AnnotationStore  (store.rs)   ← public/private collections
//!   │     ├── KeyValueStore  (storage.rs)  write-through persistence
//!   │     └── ResourceSource (source.rs)   static public JSON
//!   ├── PlacementController (placement.rs)
//!   ├── Session / RolePolicy (session.rs)
//!   └── MapGeometry (coords.rs)       ← pixel ⇄ block conversion
//! ```

pub mod config;
pub mod coords;
pub mod error;
pub mod placement;
pub mod protocol;
pub mod render;
pub mod session;
pub mod source;
pub mod storage;
pub mod store;
pub mod types;
pub mod viewer;

// Convenience re-exports
pub use config::{ResourceConfig, ViewerConfig};
pub use coords::{to_game_coord, to_map_point, MapGeometry};
pub use error::{Result, ViewerError};
pub use placement::{ClickOutcome, InputRequest, Measurement, PlacementController, PlacementMode};
pub use render::{LayerId, RenderCommand};
pub use session::{can, Capability, Credential, Role, RolePolicy, Session};
pub use source::{MemorySource, ResourceSource};
pub use storage::{KeyValueStore, MemoryStorage};
pub use store::AnnotationStore;
pub use types::{
    AnnotationId, AnnotationKind, AnnotationMatcher, GameCoord, MapPoint, Marker, MarkerKind,
    Scope, TownLabel,
};
pub use viewer::{PublicExport, Viewer};
