//! 角色查询服务
//!
//! Free-text role lookup for selection UIs, independent of the
//! permission gates.

use crate::db::repository::{RepoResult, role};
use serde::Serialize;
use shared::models::Role;
use sqlx::SqlitePool;

/// One selectable entry for autocomplete-style widgets
#[derive(Debug, Clone, Serialize)]
pub struct RoleOption {
    pub id: i64,
    pub label: String,
}

#[derive(Clone)]
pub struct RoleQueryService {
    pool: SqlitePool,
}

impl RoleQueryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All valid roles
    pub async fn valid_roles(&self) -> RepoResult<Vec<Role>> {
        role::list_valid(&self.pool).await
    }

    /// Substring match against title OR name, restricted to valid roles.
    ///
    /// An empty query degenerates to listing every valid role. LIKE
    /// metacharacters in the needle are escaped so user text matches
    /// literally.
    pub async fn search_roles(&self, query: &str) -> RepoResult<Vec<Role>> {
        let pattern = format!("%{}%", escape_like(query));
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name, title, is_admin, permissions, exclude_permissions, hierarchical_roles, valid, menu_json, created_by, updated_by, create_time, update_time FROM role WHERE (title LIKE ? ESCAPE '\\' OR name LIKE ? ESCAPE '\\') AND valid = 1 ORDER BY name",
        )
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    /// Format roles for a selection widget: label = "{title} ({name})"
    pub fn format_for_selection(&self, roles: &[Role]) -> Vec<RoleOption> {
        roles
            .iter()
            .map(|role| RoleOption {
                id: role.id,
                label: format!("{} ({})", role.title, role.name),
            })
            .collect()
    }
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
