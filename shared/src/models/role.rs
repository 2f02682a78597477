//! Role Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base role every newly created role inherits from by default
pub const BASE_ROLE: &str = "operator";

/// Max length of the machine name
pub const MAX_ROLE_NAME_LEN: usize = 80;
/// Max length of the human title
pub const MAX_ROLE_TITLE_LEN: usize = 255;
/// Max length of the opaque menu blob
pub const MAX_MENU_JSON_LEN: usize = 65535;

/// Role entity (RBAC 角色)
///
/// `name` is the stable machine key, matched against the role names the
/// identity layer attaches to a principal. `permissions` and
/// `exclude_permissions` hold permission-key strings; `hierarchical_roles`
/// holds names of roles this one inherits permissions from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub title: String,
    /// Wildcard grant: the role carries every permission
    pub is_admin: bool,
    /// JSON array of permission keys (e.g. ["orders:read", "reports:*"])
    #[cfg_attr(feature = "db", sqlx(json))]
    pub permissions: Vec<String>,
    /// Keys revoked even if granted directly or via inheritance
    #[cfg_attr(feature = "db", sqlx(json))]
    pub exclude_permissions: Vec<String>,
    /// Names of roles this role inherits permissions from
    #[cfg_attr(feature = "db", sqlx(json))]
    pub hierarchical_roles: Vec<String>,
    pub valid: bool,
    /// Opaque menu configuration blob; stored and returned untouched
    pub menu_json: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub create_time: i64,
    pub update_time: i64,
}

impl Role {
    /// Create a new in-memory role with default flags and hierarchy.
    ///
    /// The base role itself starts with an empty hierarchy so it never
    /// inherits from itself.
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        let name = name.into();
        let hierarchical_roles = default_hierarchy(&name);
        Self {
            id: 0,
            name,
            title: title.into(),
            is_admin: false,
            permissions: Vec::new(),
            exclude_permissions: Vec::new(),
            hierarchical_roles,
            valid: true,
            menu_json: None,
            created_by: None,
            updated_by: None,
            create_time: 0,
            update_time: 0,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // An unsaved role renders empty
        if self.id == 0 {
            return Ok(());
        }
        write!(f, "{}({})", self.title, self.name)
    }
}

/// Default inheritance list for a role named `name`
pub fn default_hierarchy(name: &str) -> Vec<String> {
    if name == BASE_ROLE {
        Vec::new()
    } else {
        vec![BASE_ROLE.to_string()]
    }
}

/// Sort and dedup a permission-key list.
///
/// Permission sets are order-insensitive with unique values; normalizing on
/// write keeps stored JSON deterministic.
pub fn normalize_keys(mut keys: Vec<String>) -> Vec<String> {
    keys.sort();
    keys.dedup();
    keys
}

/// Create role payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCreate {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub exclude_permissions: Vec<String>,
    /// None falls back to the default hierarchy for the role name
    pub hierarchical_roles: Option<Vec<String>>,
    pub menu_json: Option<String>,
}

impl RoleCreate {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            is_admin: false,
            permissions: Vec::new(),
            exclude_permissions: Vec::new(),
            hierarchical_roles: None,
            menu_json: None,
        }
    }
}

/// Update role payload — None fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub is_admin: Option<bool>,
    pub permissions: Option<Vec<String>>,
    pub exclude_permissions: Option<Vec<String>>,
    pub hierarchical_roles: Option<Vec<String>>,
    pub valid: Option<bool>,
    pub menu_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_role_defaults() {
        let role = Role::new("auditor", "审计员");
        assert!(role.valid);
        assert!(!role.is_admin);
        assert!(role.permissions.is_empty());
        assert!(role.exclude_permissions.is_empty());
        assert_eq!(role.hierarchical_roles, vec![BASE_ROLE.to_string()]);
    }

    #[test]
    fn base_role_does_not_inherit_itself() {
        let role = Role::new(BASE_ROLE, "Operator");
        assert!(role.hierarchical_roles.is_empty());
    }

    #[test]
    fn display_renders_title_and_name() {
        let mut role = Role::new("admin", "系统管理员");
        assert_eq!(role.to_string(), "");
        role.id = 42;
        assert_eq!(role.to_string(), "系统管理员(admin)");
    }

    #[test]
    fn normalize_keys_sorts_and_dedups() {
        let keys = normalize_keys(vec![
            "b:write".to_string(),
            "a:read".to_string(),
            "b:write".to_string(),
        ]);
        assert_eq!(keys, vec!["a:read".to_string(), "b:write".to_string()]);
    }
}
