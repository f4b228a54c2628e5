//! Viewer configuration.
//!
//! ## Layers (later wins)
//!
//! 1. Built-in defaults ([`ViewerConfig::default`])
//! 2. An optional TOML document (file natively, embedded string in the browser)
//! 3. Environment variables prefixed `RAVENMAP__`, nested with `__`
//!    (e.g. `RAVENMAP__MAP__ORIGIN=1408`)
//!
//! | Key                              | Default                  |
//! |----------------------------------|--------------------------|
//! | `map.map_size`                   | `2944`                   |
//! | `map.origin`                     | `1408`                   |
//! | `map.offset_x` / `map.offset_z`  | `0` / `0`                |
//! | `map.grid_spacing`               | `32`                     |
//! | `resources.public_markers`       | `publicMarkers.json`     |
//! | `resources.public_towns`         | `publicTowns.json`       |
//! | `resources.private_markers_key`  | `privateMarkers`         |
//! | `resources.private_towns_key`    | `privateTowns`           |
//! | `policy.*`                       | `["admin", "mod"]`       |

use crate::coords::MapGeometry;
use crate::error::Result;
use crate::protocol::resources;
use crate::session::{default_credentials, Credential, RolePolicy};
use crate::types::AnnotationKind;
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "RAVENMAP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub public_markers: String,
    pub public_towns: String,
    pub private_markers_key: String,
    pub private_towns_key: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            public_markers: resources::PUBLIC_MARKERS.into(),
            public_towns: resources::PUBLIC_TOWNS.into(),
            private_markers_key: resources::PRIVATE_MARKERS_KEY.into(),
            private_towns_key: resources::PRIVATE_TOWNS_KEY.into(),
        }
    }
}

impl ResourceConfig {
    /// Name of the static resource (and export file) for `kind`.
    pub fn public_resource(&self, kind: AnnotationKind) -> &str {
        match kind {
            AnnotationKind::Markers => &self.public_markers,
            AnnotationKind::Towns => &self.public_towns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub map: MapGeometry,
    pub resources: ResourceConfig,
    pub credentials: Vec<Credential>,
    pub policy: RolePolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            map: MapGeometry::default(),
            resources: ResourceConfig::default(),
            credentials: default_credentials(),
            policy: RolePolicy::default(),
        }
    }
}

impl ViewerConfig {
    /// Defaults overlaid with a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Defaults, then the optional TOML file, then `RAVENMAP__*` variables.
    #[cfg(feature = "native")]
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        use config::Environment;

        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ViewerConfig::default());
    }

    #[test]
    fn toml_overrides_geometry_and_policy() {
        let cfg = ViewerConfig::from_toml_str(
            r#"
            [map]
            offset_x = 16

            [policy]
            export_public_markers = ["admin"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.map.offset_x, 16.0);
        assert_eq!(cfg.map.origin, 1408.0);
        assert_eq!(cfg.policy.export_public_markers, vec![Role::Admin]);
        assert_eq!(cfg.policy.place_town, vec![Role::Admin, Role::Moderator]);
    }

    #[test]
    fn credentials_can_be_replaced() {
        let cfg = ViewerConfig::from_toml_str(
            r#"
            [[credentials]]
            username = "Warden"
            password = "pw"
            role = "moderator"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.credentials.len(), 1);
        assert_eq!(cfg.credentials[0].role, Role::Moderator);
    }

    #[test]
    fn resource_names_follow_kind() {
        let r = ResourceConfig::default();
        assert_eq!(r.public_resource(AnnotationKind::Markers), "publicMarkers.json");
        assert_eq!(r.public_resource(AnnotationKind::Towns), "publicTowns.json");
    }

    #[cfg(feature = "native")]
    #[test]
    fn load_without_file_uses_defaults() {
        let cfg = ViewerConfig::load(None).unwrap();
        assert_eq!(cfg.map.map_size, 2944.0);
    }
}
