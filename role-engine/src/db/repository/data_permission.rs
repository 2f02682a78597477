//! Data Permission Rule Repository
//!
//! The (role_id, entity_class) UNIQUE constraint is the enforcement point
//! for rule uniqueness; constraint hits are translated into
//! [`RepoError::Duplicate`] instead of leaking raw storage errors.

use super::{
    RepoError, RepoResult, is_fk_violation, is_unique_violation, validate_optional_text,
    validate_required_text,
};
use shared::models::{
    DataPermissionRule, DataPermissionRuleCreate, DataPermissionRuleUpdate, MAX_ENTITY_CLASS_LEN,
    MAX_REMARK_LEN, MAX_STATEMENT_LEN,
};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

/// Find rule by id
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<DataPermissionRule>> {
    let rule = sqlx::query_as::<_, DataPermissionRule>(
        "SELECT id, role_id, entity_class, statement, remark, valid, created_by, updated_by, create_time, update_time FROM data_permission_rule WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(rule)
}

/// All rules owned by a role, ordered by entity class
pub async fn find_by_role(pool: &SqlitePool, role_id: i64) -> RepoResult<Vec<DataPermissionRule>> {
    let rules = sqlx::query_as::<_, DataPermissionRule>(
        "SELECT id, role_id, entity_class, statement, remark, valid, created_by, updated_by, create_time, update_time FROM data_permission_rule WHERE role_id = ? ORDER BY entity_class",
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;
    Ok(rules)
}

/// Valid rules for `entity_class` owned by any valid role named in
/// `role_names`. Ordered by role name so downstream composition is stable.
pub async fn find_valid_for_entity(
    pool: &SqlitePool,
    entity_class: &str,
    role_names: &[String],
) -> RepoResult<Vec<DataPermissionRule>> {
    if role_names.is_empty() {
        return Ok(Vec::new());
    }

    // Dynamic placeholder list for the IN clause
    let placeholders = vec!["?"; role_names.len()].join(", ");
    let sql = format!(
        "SELECT d.id, d.role_id, d.entity_class, d.statement, d.remark, d.valid, d.created_by, d.updated_by, d.create_time, d.update_time FROM data_permission_rule d JOIN role r ON r.id = d.role_id WHERE d.entity_class = ? AND d.valid = 1 AND r.valid = 1 AND r.name IN ({placeholders}) ORDER BY r.name"
    );

    let mut query = sqlx::query_as::<_, DataPermissionRule>(&sql).bind(entity_class);
    for name in role_names {
        query = query.bind(name);
    }

    let rules = query.fetch_all(pool).await?;
    Ok(rules)
}

/// Create a new rule
pub async fn create(
    pool: &SqlitePool,
    data: DataPermissionRuleCreate,
    operator: Option<&str>,
) -> RepoResult<DataPermissionRule> {
    validate_required_text(&data.entity_class, "entity_class", MAX_ENTITY_CLASS_LEN)?;
    validate_required_text(&data.statement, "statement", MAX_STATEMENT_LEN)?;
    validate_optional_text(&data.remark, "remark", MAX_REMARK_LEN)?;

    let now = now_millis();
    let id = snowflake_id();

    sqlx::query(
        "INSERT INTO data_permission_rule (id, role_id, entity_class, statement, remark, valid, created_by, updated_by, create_time, update_time) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(data.role_id)
    .bind(&data.entity_class)
    .bind(&data.statement)
    .bind(&data.remark)
    .bind(data.valid)
    .bind(operator)
    .bind(operator)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate(format!(
                "Rule for role {} on '{}' already exists",
                data.role_id, data.entity_class
            ))
        } else if is_fk_violation(&e) {
            RepoError::Validation(format!("Role {} does not exist", data.role_id))
        } else {
            e.into()
        }
    })?;

    tracing::info!(role_id = data.role_id, entity_class = %data.entity_class, "Data permission rule created");

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create data permission rule".into()))
}

/// Partial update; None fields keep their stored values
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: DataPermissionRuleUpdate,
    operator: Option<&str>,
) -> RepoResult<DataPermissionRule> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Data permission rule {id} not found")))?;

    if let Some(ref entity_class) = data.entity_class {
        validate_required_text(entity_class, "entity_class", MAX_ENTITY_CLASS_LEN)?;
    }
    if let Some(ref statement) = data.statement {
        validate_required_text(statement, "statement", MAX_STATEMENT_LEN)?;
    }
    validate_optional_text(&data.remark, "remark", MAX_REMARK_LEN)?;

    sqlx::query(
        "UPDATE data_permission_rule SET entity_class = COALESCE(?, entity_class), statement = COALESCE(?, statement), remark = COALESCE(?, remark), valid = COALESCE(?, valid), updated_by = COALESCE(?, updated_by), update_time = ? WHERE id = ?",
    )
    .bind(&data.entity_class)
    .bind(&data.statement)
    .bind(&data.remark)
    .bind(data.valid)
    .bind(operator)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate(format!(
                "Rule for role {} on '{}' already exists",
                existing.role_id,
                data.entity_class.as_deref().unwrap_or(&existing.entity_class)
            ))
        } else {
            e.into()
        }
    })?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Data permission rule {id} not found")))
}

/// Persist pending changes of a loaded rule.
///
/// Single statement, generic over the executor so several rule changes for
/// one role can share a transaction and commit once.
pub async fn save<'e, E>(db: E, rule: &DataPermissionRule) -> RepoResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    validate_required_text(&rule.entity_class, "entity_class", MAX_ENTITY_CLASS_LEN)?;
    validate_required_text(&rule.statement, "statement", MAX_STATEMENT_LEN)?;
    validate_optional_text(&rule.remark, "remark", MAX_REMARK_LEN)?;

    let result = sqlx::query(
        "UPDATE data_permission_rule SET role_id = ?, entity_class = ?, statement = ?, remark = ?, valid = ?, updated_by = ?, update_time = ? WHERE id = ?",
    )
    .bind(rule.role_id)
    .bind(&rule.entity_class)
    .bind(&rule.statement)
    .bind(&rule.remark)
    .bind(rule.valid)
    .bind(&rule.updated_by)
    .bind(now_millis())
    .bind(rule.id)
    .execute(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RepoError::Duplicate(format!(
                "Rule for role {} on '{}' already exists",
                rule.role_id, rule.entity_class
            ))
        } else {
            RepoError::from(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Data permission rule {} not found",
            rule.id
        )));
    }
    Ok(())
}

/// Delete a rule by id
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Data permission rule {id} not found")))?;

    sqlx::query("DELETE FROM data_permission_rule WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(true)
}

/// Executor-generic delete of a loaded rule (batched writes)
pub async fn remove<'e, E>(db: E, rule: &DataPermissionRule) -> RepoResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query("DELETE FROM data_permission_rule WHERE id = ?")
        .bind(rule.id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Data permission rule {} not found",
            rule.id
        )));
    }
    Ok(())
}
