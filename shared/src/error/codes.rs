//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 8xxx: Role / data-permission errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 8xxx: Role / data permission ====================
    /// Role not found
    RoleNotFound = 8001,
    /// Role name already taken
    RoleNameTaken = 8002,
    /// Role hierarchy would contain a cycle
    RoleHierarchyCycle = 8003,
    /// find-or-create failed both the insert and the fallback lookup
    RoleCreationFailed = 8004,
    /// Data permission rule not found
    DataRuleNotFound = 8101,
    /// A rule for this (role, entity class) pair already exists
    DataRuleDuplicate = 8102,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::PermissionDenied => "Permission denied",
            Self::RoleRequired => "Role required",
            Self::AdminRequired => "Admin role required",
            Self::RoleNotFound => "Role not found",
            Self::RoleNameTaken => "Role name already taken",
            Self::RoleHierarchyCycle => "Role hierarchy contains a cycle",
            Self::RoleCreationFailed => "Failed to create or find role",
            Self::DataRuleNotFound => "Data permission rule not found",
            Self::DataRuleDuplicate => "Duplicate data permission rule",
            Self::InternalError => "Internal error",
            Self::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code as u16
    }
}

/// Error returned when deserializing an unrecognized numeric error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            2001 => Self::PermissionDenied,
            2002 => Self::RoleRequired,
            2003 => Self::AdminRequired,
            8001 => Self::RoleNotFound,
            8002 => Self::RoleNameTaken,
            8003 => Self::RoleHierarchyCycle,
            8004 => Self::RoleCreationFailed,
            8101 => Self::DataRuleNotFound,
            8102 => Self::DataRuleDuplicate,
            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", *self as u16)
    }
}
