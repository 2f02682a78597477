//! Repository Module
//!
//! CRUD operations for the role and data-permission tables over the shared
//! SQLite pool. Multi-statement operations take `&SqlitePool`; single-statement
//! writes (`save` / `remove`) are generic over the executor so callers can
//! stage several mutations inside one `sqlx` transaction and commit once.

pub mod data_permission;
pub mod role;

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Role hierarchy would contain a cycle; carries the offending path
    #[error("Hierarchy cycle: {0}")]
    Cycle(String),

    /// find_or_create failed both the atomic insert and the fallback lookup
    #[error("Failed to create or find role: {0}")]
    RoleCreation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Translate repository failures into the coded error surface admin-facing
/// callers render messages from.
impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match &err {
            RepoError::NotFound(what) => AppError::not_found(what.clone()),
            RepoError::Duplicate(what) => AppError::already_exists(what.clone()),
            RepoError::Validation(msg) => AppError::validation(msg.clone()),
            RepoError::Cycle(path) => {
                AppError::with_message(ErrorCode::RoleHierarchyCycle, err.to_string())
                    .with_detail("path", path.clone())
            }
            RepoError::RoleCreation(name) => {
                AppError::with_message(ErrorCode::RoleCreationFailed, err.to_string())
                    .with_detail("name", name.clone())
            }
            RepoError::Database(msg) => AppError::database(msg.clone()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// True when the error is the storage layer reporting a UNIQUE constraint hit
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// True when the error is a foreign-key constraint hit (e.g. missing role)
pub(crate) fn is_fk_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

// ── Validation helpers ──────────────────────────────────────────────
//
// SQLite TEXT enforces no lengths; limits live in shared::models and are
// checked here at the write boundary.

/// Validate that a required string is non-empty and within the length limit.
pub(crate) fn validate_required_text(
    value: &str,
    field: &str,
    max_len: usize,
) -> RepoResult<()> {
    if value.trim().is_empty() {
        return Err(RepoError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(RepoError::Validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub(crate) fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> RepoResult<()> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(RepoError::Validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}
