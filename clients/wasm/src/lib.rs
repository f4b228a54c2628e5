//! Raven County map viewer WASM client: crate root.
//!
//! Compile with:
//!
//! ```bash
//! wasm-pack build --target web --release
//! ```
//!
//! Or for development (faster, includes debug info):
//!
//! ```bash
//! wasm-pack build --target web --dev
//! ```

// Improve WASM panic messages in the browser console.
pub use console_error_panic_hook::set_once as set_panic_hook;

pub mod client;
pub mod events;
pub mod fetch;
pub mod storage;

pub use client::RavenMapViewer;

use wasm_bindgen::prelude::*;

/// Called automatically by the generated JS glue on `init()`.
///
/// Sets up the panic hook and routes `log` output to the DevTools console.
#[wasm_bindgen(start)]
pub fn wasm_main() {
    set_panic_hook();
    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("ravenmap-wasm initialised");
}
