//! Shared types for the role/data-permission engine
//!
//! Common types used across crates: entity models, error codes,
//! and utility functions (snowflake IDs, timestamps).

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use serde::{Deserialize, Serialize};
