//! Data models
//!
//! Shared between the engine and its admin-facing callers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY, snowflake-generated).

pub mod data_permission;
pub mod principal;
pub mod role;

// Re-exports
pub use data_permission::*;
pub use principal::*;
pub use role::*;
