//! Public resources over `window.fetch`.

use async_trait::async_trait;
use ravenmap::{ResourceSource, Result, ViewerError};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Fetches `<base_url><resource>` relative to the page.
#[derive(Debug, Clone, Default)]
pub struct FetchSource {
    base_url: String,
}

impl FetchSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    pub fn url_for(&self, resource: &str) -> String {
        if self.base_url.is_empty() || self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, resource)
        } else {
            format!("{}/{}", self.base_url, resource)
        }
    }
}

fn unavailable(resource: &str, reason: impl Into<String>) -> ViewerError {
    ViewerError::ResourceUnavailable {
        resource: resource.to_string(),
        reason: reason.into(),
    }
}

#[async_trait(?Send)]
impl ResourceSource for FetchSource {
    async fn fetch(&self, resource: &str) -> Result<String> {
        let window = web_sys::window().ok_or_else(|| unavailable(resource, "no window"))?;
        let url = self.url_for(resource);

        let resp = JsFuture::from(window.fetch_with_str(&url))
            .await
            .map_err(|e| unavailable(resource, format!("{:?}", e)))?;
        let resp: web_sys::Response = resp
            .dyn_into()
            .map_err(|_| unavailable(resource, "fetch did not return a Response"))?;
        if !resp.ok() {
            return Err(unavailable(resource, format!("HTTP {}", resp.status())));
        }

        let text = resp
            .text()
            .map_err(|e| unavailable(resource, format!("{:?}", e)))?;
        let body = JsFuture::from(text)
            .await
            .map_err(|e| unavailable(resource, format!("{:?}", e)))?;
        body.as_string()
            .ok_or_else(|| unavailable(resource, "body is not text"))
    }
}
