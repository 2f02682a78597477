//! Data Permission Rule Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Max length of the target entity type name
pub const MAX_ENTITY_CLASS_LEN: usize = 255;
/// Max length of the predicate fragment
pub const MAX_STATEMENT_LEN: usize = 65535;
/// Max length of the free-text remark
pub const MAX_REMARK_LEN: usize = 65535;

/// Entity-scoped row filter owned by a role (角色实体数据权限)
///
/// `statement` is a boolean predicate fragment in the query language of the
/// underlying store, without the leading WHERE/AND keyword. Fragments are
/// trusted input: they are authored by administrators through the management
/// interface and must never be derived from end-user input — the engine
/// applies no sanitization when composing them into queries.
///
/// At most one rule exists per (role, entity class) pair; a rule is inert
/// until `valid` is explicitly set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DataPermissionRule {
    pub id: i64,
    /// Owning role; rules are cascade-deleted with it
    pub role_id: i64,
    pub entity_class: String,
    pub statement: String,
    pub remark: Option<String>,
    pub valid: bool,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub create_time: i64,
    pub update_time: i64,
}

impl fmt::Display for DataPermissionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id == 0 {
            return Ok(());
        }
        write!(f, "DataPermissionRule {} ({})", self.id, self.entity_class)
    }
}

/// Create rule payload — rules start inert (`valid = false`) unless
/// explicitly activated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPermissionRuleCreate {
    pub role_id: i64,
    pub entity_class: String,
    pub statement: String,
    pub remark: Option<String>,
    #[serde(default)]
    pub valid: bool,
}

impl DataPermissionRuleCreate {
    pub fn new(
        role_id: i64,
        entity_class: impl Into<String>,
        statement: impl Into<String>,
    ) -> Self {
        Self {
            role_id,
            entity_class: entity_class.into(),
            statement: statement.into(),
            remark: None,
            valid: false,
        }
    }
}

/// Update rule payload — None fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataPermissionRuleUpdate {
    pub entity_class: Option<String>,
    pub statement: Option<String>,
    pub remark: Option<String>,
    pub valid: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_defaults_to_inert() {
        let data = DataPermissionRuleCreate::new(1, "App\\Entity\\User", "1 = 1");
        assert!(!data.valid);
        assert!(data.remark.is_none());
    }

    #[test]
    fn display_includes_entity_class() {
        let rule = DataPermissionRule {
            id: 7,
            role_id: 1,
            entity_class: "App\\Entity\\Content".to_string(),
            statement: "status = \"published\"".to_string(),
            remark: None,
            valid: true,
            created_by: None,
            updated_by: None,
            create_time: 0,
            update_time: 0,
        };
        assert_eq!(rule.to_string(), "DataPermissionRule 7 (App\\Entity\\Content)");
    }
}
