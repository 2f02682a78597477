//! Permission Evaluator
//!
//! Read-side composition of a principal's action permissions and row
//! filters. Pure functions do the actual computation; [`PermissionEvaluator`]
//! feeds them from the store. Nothing here mutates role or rule state.

use crate::auth::hierarchy;
use crate::db::repository::{RepoResult, data_permission, role};
use shared::models::{Principal, Role};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};

/// Fully resolved action-permission set
///
/// `has` honors the admin wildcard, the special `"all"` key, and
/// `prefix:*` patterns (e.g. `"reports:*"` matches `"reports:view"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissions {
    admin: bool,
    keys: BTreeSet<String>,
}

impl EffectivePermissions {
    /// The wildcard set carried by admin roles
    pub fn admin() -> Self {
        Self {
            admin: true,
            keys: BTreeSet::new(),
        }
    }

    pub fn from_keys(keys: BTreeSet<String>) -> Self {
        Self { admin: false, keys }
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Explicit keys; empty for a pure admin grant
    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        !self.admin && self.keys.is_empty()
    }

    /// Union another resolved set into this one
    pub fn merge(&mut self, other: EffectivePermissions) {
        self.admin |= other.admin;
        self.keys.extend(other.keys);
    }

    /// Check whether the set grants `permission`
    pub fn has(&self, permission: &str) -> bool {
        // 管理员拥有所有权限
        if self.admin {
            return true;
        }

        // 检查特殊 'all' 权限
        if self.keys.contains("all") {
            return true;
        }

        // 精确匹配或通配符匹配
        self.keys.iter().any(|p| {
            if p == permission {
                return true;
            }
            // 处理通配符模式，如 "products:*" 匹配 "products:create"
            if let Some(prefix) = p.strip_suffix(":*") {
                permission.starts_with(&format!("{}:", prefix))
            } else {
                false
            }
        })
    }
}

/// Resolve one role against the stored graph.
///
/// Effective set = own permissions ∪ permissions of valid roles reachable
/// through `hierarchical_roles`, minus the role's own exclusions. An admin
/// role resolves to the wildcard; exclusions do not apply to admins.
pub fn resolve_role_permissions(
    role: &Role,
    roles_by_name: &HashMap<String, Role>,
) -> EffectivePermissions {
    if role.is_admin {
        return EffectivePermissions::admin();
    }

    let mut keys: BTreeSet<String> = BTreeSet::new();
    for reached in hierarchy::reachable_roles(role, roles_by_name) {
        keys.extend(reached.permissions.iter().cloned());
    }
    for excluded in &role.exclude_permissions {
        keys.remove(excluded);
    }

    EffectivePermissions::from_keys(keys)
}

/// Combine row-filter fragments into one predicate.
///
/// Each fragment is parenthesized before joining with OR so its own
/// top-level operators survive the combination. Blank fragments are
/// dropped; no fragments at all yields `None`.
pub fn combine_row_filters<I>(fragments: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let parts: Vec<String> = fragments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| format!("({s})"))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" OR "))
    }
}

/// Pool-backed evaluator used by authorization call sites
#[derive(Clone)]
pub struct PermissionEvaluator {
    pool: SqlitePool,
}

impl PermissionEvaluator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Union of role-level effective permissions across the principal's
    /// valid roles. Unknown and invalid role names are skipped.
    pub async fn effective_permission_set(
        &self,
        principal: &Principal,
    ) -> RepoResult<EffectivePermissions> {
        let mut acc = EffectivePermissions::default();
        if principal.roles.is_empty() {
            return Ok(acc);
        }

        let roles_by_name = self.valid_roles_by_name().await?;
        for name in &principal.roles {
            let Some(role) = roles_by_name.get(name) else {
                continue;
            };
            acc.merge(resolve_role_permissions(role, &roles_by_name));
            if acc.is_admin() {
                break;
            }
        }

        Ok(acc)
    }

    /// OR-combined row filter for `entity_class`, or `None` when no valid
    /// rule of any of the principal's valid roles applies. What absence
    /// means (full access vs none) is the caller's policy.
    pub async fn effective_row_filter(
        &self,
        principal: &Principal,
        entity_class: &str,
    ) -> RepoResult<Option<String>> {
        if principal.roles.is_empty() {
            return Ok(None);
        }

        let rules =
            data_permission::find_valid_for_entity(&self.pool, entity_class, &principal.roles)
                .await?;
        Ok(combine_row_filters(rules.into_iter().map(|r| r.statement)))
    }

    async fn valid_roles_by_name(&self) -> RepoResult<HashMap<String, Role>> {
        let roles = role::list_valid(&self.pool).await?;
        Ok(roles.into_iter().map(|r| (r.name.clone(), r)).collect())
    }
}
