//! Role Repository

use super::{
    RepoError, RepoResult, is_unique_violation, validate_optional_text, validate_required_text,
};
use crate::auth::hierarchy;
use shared::models::{
    MAX_MENU_JSON_LEN, MAX_ROLE_NAME_LEN, MAX_ROLE_TITLE_LEN, Role, RoleCreate, RoleUpdate,
    default_hierarchy, normalize_keys,
};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Find role by id
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, title, is_admin, permissions, exclude_permissions, hierarchical_roles, valid, menu_json, created_by, updated_by, create_time, update_time FROM role WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(role)
}

/// Find role by exact machine name
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, title, is_admin, permissions, exclude_permissions, hierarchical_roles, valid, menu_json, created_by, updated_by, create_time, update_time FROM role WHERE name = ? LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(role)
}

/// All valid roles, ordered by name
pub async fn list_valid(pool: &SqlitePool) -> RepoResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT id, name, title, is_admin, permissions, exclude_permissions, hierarchical_roles, valid, menu_json, created_by, updated_by, create_time, update_time FROM role WHERE valid = 1 ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

/// All roles including invalid ones (admin listings)
pub async fn find_all_with_inactive(pool: &SqlitePool) -> RepoResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT id, name, title, is_admin, permissions, exclude_permissions, hierarchical_roles, valid, menu_json, created_by, updated_by, create_time, update_time FROM role ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

/// Atomic find-or-create by name.
///
/// INSERT OR IGNORE resolves the race between concurrent callers at the
/// storage layer; losing the race silently falls through to the read. A
/// missing row after both legs signals a storage fault, not a normal
/// "already exists".
pub async fn find_or_create(
    pool: &SqlitePool,
    name: &str,
    title: Option<&str>,
) -> RepoResult<Role> {
    validate_required_text(name, "name", MAX_ROLE_NAME_LEN)?;
    let title = title.unwrap_or(name);
    validate_required_text(title, "title", MAX_ROLE_TITLE_LEN)?;

    let hierarchy_json = serde_json::to_string(&default_hierarchy(name))
        .unwrap_or_else(|_| "[]".to_string());
    let now = now_millis();
    let id = snowflake_id();

    let result = sqlx::query(
        "INSERT OR IGNORE INTO role (id, name, title, is_admin, permissions, exclude_permissions, hierarchical_roles, valid, create_time, update_time) VALUES (?, ?, ?, 0, '[]', '[]', ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(title)
    .bind(hierarchy_json)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    if result.rows_affected() == 1 {
        tracing::info!(role_name = %name, "Role created via find_or_create");
    }

    match find_by_name(pool, name).await? {
        Some(role) => Ok(role),
        None => {
            tracing::error!(role_name = %name, "find_or_create: insert ignored and fallback lookup empty");
            Err(RepoError::RoleCreation(name.to_string()))
        }
    }
}

/// Create a new role
pub async fn create(
    pool: &SqlitePool,
    data: RoleCreate,
    operator: Option<&str>,
) -> RepoResult<Role> {
    validate_required_text(&data.name, "name", MAX_ROLE_NAME_LEN)?;
    validate_required_text(&data.title, "title", MAX_ROLE_TITLE_LEN)?;
    validate_optional_text(&data.menu_json, "menu_json", MAX_MENU_JSON_LEN)?;

    let hierarchical_roles = data
        .hierarchical_roles
        .unwrap_or_else(|| default_hierarchy(&data.name));
    ensure_acyclic(pool, &data.name, &hierarchical_roles, None).await?;

    let permissions_json = serde_json::to_string(&normalize_keys(data.permissions))
        .unwrap_or_else(|_| "[]".to_string());
    let exclude_json = serde_json::to_string(&normalize_keys(data.exclude_permissions))
        .unwrap_or_else(|_| "[]".to_string());
    let hierarchy_json =
        serde_json::to_string(&hierarchical_roles).unwrap_or_else(|_| "[]".to_string());
    let now = now_millis();
    let id = snowflake_id();

    sqlx::query(
        "INSERT INTO role (id, name, title, is_admin, permissions, exclude_permissions, hierarchical_roles, valid, menu_json, created_by, updated_by, create_time, update_time) VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.title)
    .bind(data.is_admin)
    .bind(permissions_json)
    .bind(exclude_json)
    .bind(hierarchy_json)
    .bind(&data.menu_json)
    .bind(operator)
    .bind(operator)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate(format!("Role name '{}' already exists", data.name))
        } else {
            e.into()
        }
    })?;

    tracing::info!(role_name = %data.name, "Role created");

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create role".into()))
}

/// Partial update; None fields keep their stored values
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: RoleUpdate,
    operator: Option<&str>,
) -> RepoResult<Role> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Role {id} not found")))?;

    if let Some(ref name) = data.name {
        validate_required_text(name, "name", MAX_ROLE_NAME_LEN)?;
    }
    if let Some(ref title) = data.title {
        validate_required_text(title, "title", MAX_ROLE_TITLE_LEN)?;
    }
    validate_optional_text(&data.menu_json, "menu_json", MAX_MENU_JSON_LEN)?;

    // Re-probe the hierarchy when the graph can change shape
    if data.name.is_some() || data.hierarchical_roles.is_some() {
        let candidate_name = data.name.as_deref().unwrap_or(&existing.name);
        let candidate_hierarchy = data
            .hierarchical_roles
            .as_deref()
            .unwrap_or(&existing.hierarchical_roles);
        ensure_acyclic(pool, candidate_name, candidate_hierarchy, Some(&existing.name)).await?;
    }

    let permissions_json = data.permissions.map(|p| {
        serde_json::to_string(&normalize_keys(p)).unwrap_or_else(|_| "[]".to_string())
    });
    let exclude_json = data.exclude_permissions.map(|p| {
        serde_json::to_string(&normalize_keys(p)).unwrap_or_else(|_| "[]".to_string())
    });
    let hierarchy_json = data
        .hierarchical_roles
        .map(|h| serde_json::to_string(&h).unwrap_or_else(|_| "[]".to_string()));

    let result = sqlx::query(
        "UPDATE role SET name = COALESCE(?, name), title = COALESCE(?, title), is_admin = COALESCE(?, is_admin), permissions = COALESCE(?, permissions), exclude_permissions = COALESCE(?, exclude_permissions), hierarchical_roles = COALESCE(?, hierarchical_roles), valid = COALESCE(?, valid), menu_json = COALESCE(?, menu_json), updated_by = COALESCE(?, updated_by), update_time = ? WHERE id = ?",
    )
    .bind(&data.name)
    .bind(&data.title)
    .bind(data.is_admin)
    .bind(permissions_json)
    .bind(exclude_json)
    .bind(hierarchy_json)
    .bind(data.valid)
    .bind(&data.menu_json)
    .bind(operator)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate(format!(
                "Role name '{}' already exists",
                data.name.as_deref().unwrap_or("")
            ))
        } else {
            e.into()
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Role {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Role {id} not found")))
}

/// Persist pending changes of a loaded role.
///
/// Single statement, generic over the executor: pass the pool for an
/// immediate durability point, or a transaction connection to batch several
/// writes and commit once. Graph acyclicity is enforced on `create`/`update`;
/// read-side resolution tolerates anything this writes.
pub async fn save<'e, E>(db: E, role: &Role) -> RepoResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    validate_required_text(&role.name, "name", MAX_ROLE_NAME_LEN)?;
    validate_required_text(&role.title, "title", MAX_ROLE_TITLE_LEN)?;
    validate_optional_text(&role.menu_json, "menu_json", MAX_MENU_JSON_LEN)?;

    let permissions_json =
        serde_json::to_string(&role.permissions).unwrap_or_else(|_| "[]".to_string());
    let exclude_json =
        serde_json::to_string(&role.exclude_permissions).unwrap_or_else(|_| "[]".to_string());
    let hierarchy_json =
        serde_json::to_string(&role.hierarchical_roles).unwrap_or_else(|_| "[]".to_string());

    let result = sqlx::query(
        "UPDATE role SET name = ?, title = ?, is_admin = ?, permissions = ?, exclude_permissions = ?, hierarchical_roles = ?, valid = ?, menu_json = ?, updated_by = ?, update_time = ? WHERE id = ?",
    )
    .bind(&role.name)
    .bind(&role.title)
    .bind(role.is_admin)
    .bind(permissions_json)
    .bind(exclude_json)
    .bind(hierarchy_json)
    .bind(role.valid)
    .bind(&role.menu_json)
    .bind(&role.updated_by)
    .bind(now_millis())
    .bind(role.id)
    .execute(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate(format!("Role name '{}' already exists", role.name))
        } else {
            RepoError::from(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Role {} not found", role.id)));
    }
    Ok(())
}

/// Delete a role by id; owned data-permission rules cascade with it
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Role {id} not found")))?;

    sqlx::query("DELETE FROM role WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!(role_name = %existing.name, "Role deleted");
    Ok(true)
}

/// Executor-generic delete of a loaded role (batched writes)
pub async fn remove<'e, E>(db: E, role: &Role) -> RepoResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query("DELETE FROM role WHERE id = ?")
        .bind(role.id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Role {} not found", role.id)));
    }
    Ok(())
}

/// Reject a write whose hierarchy would close a cycle.
///
/// Probed against every stored role, valid or not — an inert cycle is still
/// a configuration bug. `rename_from` drops the stale map entry when the
/// candidate is replacing an existing name.
async fn ensure_acyclic(
    pool: &SqlitePool,
    name: &str,
    hierarchical_roles: &[String],
    rename_from: Option<&str>,
) -> RepoResult<()> {
    if hierarchical_roles.is_empty() {
        return Ok(());
    }

    let mut roles_by_name: HashMap<String, Role> = find_all_with_inactive(pool)
        .await?
        .into_iter()
        .map(|r| (r.name.clone(), r))
        .collect();
    if let Some(old_name) = rename_from {
        roles_by_name.remove(old_name);
    }

    if let Some(path) = hierarchy::detect_cycle(name, hierarchical_roles, &roles_by_name) {
        return Err(RepoError::Cycle(path.join(" -> ")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::test_pool;

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let pool = test_pool().await;
        let mut data = RoleCreate::new("manager", "门店经理");
        data.permissions = vec!["reports:view".to_string(), "orders:void".to_string()];
        let created = role_create(&pool, data).await;

        let found = find_by_name(&pool, "manager").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.title, "门店经理");
        assert!(found.valid);
        assert!(!found.is_admin);
        // Permission keys are stored normalized
        assert_eq!(found.permissions, vec!["orders:void", "reports:view"]);
        assert_eq!(found.hierarchical_roles, vec!["operator".to_string()]);
        assert_eq!(found.created_by.as_deref(), Some("tester"));
        assert!(found.create_time > 0);
    }

    #[tokio::test]
    async fn create_duplicate_name_conflicts() {
        let pool = test_pool().await;
        role_create(&pool, RoleCreate::new("manager", "Manager")).await;
        let err = create(&pool, RoleCreate::new("manager", "Other"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn create_rejects_blank_and_oversized_fields() {
        let pool = test_pool().await;
        let err = create(&pool, RoleCreate::new("  ", "Blank"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));

        let long_name = "x".repeat(MAX_ROLE_NAME_LEN + 1);
        let err = create(&pool, RoleCreate::new(long_name, "Long"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));

        let err = create(&pool, RoleCreate::new("ok", ""), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[tokio::test]
    async fn find_or_create_coalesces_to_one_row() {
        let pool = test_pool().await;
        let first = find_or_create(&pool, "auditor", Some("审计员")).await.unwrap();
        let second = find_or_create(&pool, "auditor", Some("别的标题")).await.unwrap();
        assert_eq!(first.id, second.id);
        // The losing call keeps the original title
        assert_eq!(second.title, "审计员");

        let all = find_all_with_inactive(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn find_or_create_defaults_title_to_name() {
        let pool = test_pool().await;
        let role = find_or_create(&pool, "auditor", None).await.unwrap();
        assert_eq!(role.title, "auditor");
    }

    #[tokio::test]
    async fn find_or_create_concurrent_callers_agree() {
        let pool = test_pool().await;
        let (a, b) = tokio::join!(
            find_or_create(&pool, "racer", Some("Racer")),
            find_or_create(&pool, "racer", Some("Racer")),
        );
        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn base_role_is_created_without_self_inheritance() {
        let pool = test_pool().await;
        let base = find_or_create(&pool, "operator", Some("Operator")).await.unwrap();
        assert!(base.hierarchical_roles.is_empty());
    }

    #[tokio::test]
    async fn update_is_partial() {
        let pool = test_pool().await;
        let mut data = RoleCreate::new("manager", "Manager");
        data.permissions = vec!["reports:view".to_string()];
        let created = role_create(&pool, data).await;

        let updated = update(
            &pool,
            created.id,
            RoleUpdate {
                title: Some("门店经理".to_string()),
                ..Default::default()
            },
            Some("editor"),
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "门店经理");
        assert_eq!(updated.permissions, vec!["reports:view"]);
        assert_eq!(updated.updated_by.as_deref(), Some("editor"));
    }

    #[tokio::test]
    async fn permissions_round_trip_including_empty() {
        let pool = test_pool().await;
        let created = role_create(&pool, RoleCreate::new("manager", "Manager")).await;

        let updated = update(
            &pool,
            created.id,
            RoleUpdate {
                permissions: Some(vec!["b:y".to_string(), "a:x".to_string(), "b:y".to_string()]),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(updated.permissions, vec!["a:x", "b:y"]);

        // Explicit empty set clears the stored keys
        let cleared = update(
            &pool,
            created.id,
            RoleUpdate {
                permissions: Some(Vec::new()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
        assert!(cleared.permissions.is_empty());
    }

    #[tokio::test]
    async fn rename_to_taken_name_conflicts() {
        let pool = test_pool().await;
        role_create(&pool, RoleCreate::new("manager", "Manager")).await;
        let other = role_create(&pool, RoleCreate::new("clerk", "Clerk")).await;

        let err = update(
            &pool,
            other.id,
            RoleUpdate {
                name: Some("manager".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn hierarchy_cycle_rejected_on_create() {
        let pool = test_pool().await;
        // "a" inherits the not-yet-existing "b": dangling, allowed
        let mut a = RoleCreate::new("a", "A");
        a.hierarchical_roles = Some(vec!["b".to_string()]);
        role_create(&pool, a).await;

        // "b" inheriting "a" would close a -> b -> a
        let mut b = RoleCreate::new("b", "B");
        b.hierarchical_roles = Some(vec!["a".to_string()]);
        let err = create(&pool, b, None).await.unwrap_err();
        assert!(matches!(err, RepoError::Cycle(_)));
    }

    #[tokio::test]
    async fn hierarchy_cycle_rejected_on_update() {
        let pool = test_pool().await;
        let c = role_create(&pool, RoleCreate::new("c", "C")).await;
        let mut d = RoleCreate::new("d", "D");
        d.hierarchical_roles = Some(vec!["c".to_string()]);
        role_create(&pool, d).await;

        let err = update(
            &pool,
            c.id,
            RoleUpdate {
                hierarchical_roles: Some(vec!["d".to_string()]),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Cycle(_)));
    }

    #[tokio::test]
    async fn self_inheritance_rejected() {
        let pool = test_pool().await;
        let mut data = RoleCreate::new("narcissus", "Narcissus");
        data.hierarchical_roles = Some(vec!["narcissus".to_string()]);
        let err = create(&pool, data, None).await.unwrap_err();
        assert!(matches!(err, RepoError::Cycle(_)));
    }

    #[tokio::test]
    async fn list_valid_skips_disabled_roles() {
        let pool = test_pool().await;
        let keep = role_create(&pool, RoleCreate::new("keep", "Keep")).await;
        let drop = role_create(&pool, RoleCreate::new("drop", "Drop")).await;
        update(
            &pool,
            drop.id,
            RoleUpdate {
                valid: Some(false),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

        let valid = list_valid(&pool).await.unwrap();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].id, keep.id);

        let all = find_all_with_inactive(&pool).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_role() {
        let pool = test_pool().await;
        let created = role_create(&pool, RoleCreate::new("gone", "Gone")).await;
        assert!(delete(&pool, created.id).await.unwrap());
        assert!(find_by_id(&pool, created.id).await.unwrap().is_none());

        let err = delete(&pool, created.id).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn save_in_transaction_defers_the_durability_point() {
        let pool = test_pool().await;
        let mut role = role_create(&pool, RoleCreate::new("staged", "Before")).await;
        role.title = "After".to_string();

        // Rolled-back transaction leaves the row untouched
        let mut tx = pool.begin().await.unwrap();
        save(&mut *tx, &role).await.unwrap();
        tx.rollback().await.unwrap();
        let stored = find_by_id(&pool, role.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Before");

        // Committed transaction is the single durability point
        let mut tx = pool.begin().await.unwrap();
        save(&mut *tx, &role).await.unwrap();
        tx.commit().await.unwrap();
        let stored = find_by_id(&pool, role.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "After");
    }

    #[tokio::test]
    async fn save_of_unknown_role_is_not_found() {
        let pool = test_pool().await;
        let mut ghost = Role::new("ghost", "Ghost");
        ghost.id = 12345;
        let err = save(&pool, &ghost).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    async fn role_create(pool: &SqlitePool, data: RoleCreate) -> Role {
        create(pool, data, Some("tester")).await.unwrap()
    }
}
