//! Read-only sources for the public static resources.
//!
//! Fetches may fail or never arrive; either way the affected public
//! collection stays empty. Nothing here retries.

use crate::error::{Result, ViewerError};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait(?Send)]
pub trait ResourceSource {
    /// Fetch the raw text of a named resource.
    async fn fetch(&self, resource: &str) -> Result<String>;
}

/// Resources held in memory. Missing names are unavailable.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    resources: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: &str, body: &str) -> Self {
        self.resources.insert(resource.to_string(), body.to_string());
        self
    }
}

#[async_trait(?Send)]
impl ResourceSource for MemorySource {
    async fn fetch(&self, resource: &str) -> Result<String> {
        self.resources
            .get(resource)
            .cloned()
            .ok_or_else(|| ViewerError::ResourceUnavailable {
                resource: resource.to_string(),
                reason: "not found".to_string(),
            })
    }
}
