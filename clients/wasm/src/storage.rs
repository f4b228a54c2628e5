//! `localStorage` backing for private annotations.

use ravenmap::{KeyValueStore, Result, ViewerError};

/// [`KeyValueStore`] over `window.localStorage`.
///
/// When the page has no usable storage (private browsing, sandboxed
/// iframe) reads come back empty and writes fail, so private data simply
/// does not survive a reload.
#[derive(Debug, Clone)]
pub struct BrowserStorage {
    inner: Option<web_sys::Storage>,
}

impl BrowserStorage {
    pub fn open() -> Self {
        let inner = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if inner.is_none() {
            log::warn!("[storage] localStorage unavailable; private annotations will not persist");
        }
        Self { inner }
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    fn storage(&self) -> Result<&web_sys::Storage> {
        self.inner
            .as_ref()
            .ok_or_else(|| ViewerError::Storage("localStorage unavailable".into()))
    }
}

fn js_error(op: &str, key: &str, e: wasm_bindgen::JsValue) -> ViewerError {
    ViewerError::Storage(format!("{} {}: {:?}", op, key, e))
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match &self.inner {
            Some(s) => s.get_item(key).map_err(|e| js_error("get", key, e)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| js_error("set", key, e))
    }
}
