//! Principal Model

use serde::{Deserialize, Serialize};

/// Authenticated actor, as supplied by the identity collaborator
///
/// The engine does not own principal lifecycle; it only resolves the
/// assigned role names against the role store at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Stable principal identifier (also used for audit columns)
    pub id: String,
    pub username: String,
    /// Names of the roles assigned to this principal
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        roles: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            roles,
        }
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r == name)
    }
}
