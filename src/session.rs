//! Session and role gate.
//!
//! `login` never rejects: unknown credentials fall back to an unprivileged
//! `player` session carrying the submitted name. The credential table ships
//! with the client, so it is not a trust boundary of any kind; real
//! authentication needs a server-side identity provider.

use crate::error::{Result, ViewerError};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles & sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(rename = "mod", alias = "moderator")]
    Moderator,
    Player,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Moderator => f.write_str("mod"),
            Role::Player => f.write_str("player"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.username, self.role)
    }
}

/// One entry of the static allow-list.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
        }
    }
}

/// The allow-list shipped with the viewer.
pub fn default_credentials() -> Vec<Credential> {
    vec![
        Credential::new("Kingosp4de", "BlaiseKey2026", Role::Admin),
        Credential::new("Xzyus", "HitByAAda4x4", Role::Moderator),
    ]
}

/// Resolve a credential pair to a session.
///
/// An exact `(username, password)` match yields the configured role;
/// anything else, a blank name included, yields a `player` session under
/// the submitted name. Nothing is ever rejected: this is a display identity,
/// not a trust boundary.
pub fn login(credentials: &[Credential], username: &str, password: &str) -> Session {
    let role = credentials
        .iter()
        .find(|c| c.username == username && c.password == password)
        .map(|c| c.role)
        .unwrap_or(Role::Player);

    Session {
        username: username.to_string(),
        role,
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Any logged-in identity.
    PlaceMarker,
    PlaceTown,
    /// New markers land in the public collection; also gates editing public
    /// markers.
    PublishMarkers,
    ExportPublicMarkers,
    ExportPublicTowns,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Capability::PlaceMarker => "place marker",
            Capability::PlaceTown => "place town",
            Capability::PublishMarkers => "publish markers",
            Capability::ExportPublicMarkers => "export public markers",
            Capability::ExportPublicTowns => "export public towns",
        };
        f.write_str(s)
    }
}

/// Which roles hold each privileged capability.
///
/// `PlaceMarker` is not listed: it only needs a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePolicy {
    pub place_town: Vec<Role>,
    pub publish_markers: Vec<Role>,
    pub export_public_markers: Vec<Role>,
    pub export_public_towns: Vec<Role>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        let privileged = vec![Role::Admin, Role::Moderator];
        Self {
            place_town: privileged.clone(),
            publish_markers: privileged.clone(),
            export_public_markers: privileged.clone(),
            export_public_towns: privileged,
        }
    }
}

impl RolePolicy {
    /// Moderators may publish but only admins may export.
    pub fn admin_only_exports() -> Self {
        Self {
            export_public_markers: vec![Role::Admin],
            export_public_towns: vec![Role::Admin],
            ..Self::default()
        }
    }

    pub fn allows(&self, capability: Capability, role: Role) -> bool {
        let roles = match capability {
            Capability::PlaceMarker => return true,
            Capability::PlaceTown => &self.place_town,
            Capability::PublishMarkers => &self.publish_markers,
            Capability::ExportPublicMarkers => &self.export_public_markers,
            Capability::ExportPublicTowns => &self.export_public_towns,
        };
        roles.contains(&role)
    }
}

/// Capability check. No session means no capability at all.
pub fn can(policy: &RolePolicy, capability: Capability, session: Option<&Session>) -> bool {
    session.is_some_and(|s| policy.allows(capability, s.role))
}

/// Like [`can`], but returns the error the caller should surface.
pub fn require(
    policy: &RolePolicy,
    capability: Capability,
    session: Option<&Session>,
) -> Result<()> {
    match session {
        None if capability == Capability::PlaceMarker => Err(ViewerError::AuthRequired),
        _ if can(policy, capability, session) => Ok(()),
        _ => Err(ViewerError::Permission { capability }),
    }
}
