//! 权限评估模块
//!
//! Centralizes effective-permission and row-filter computation:
//! - [`PermissionEvaluator`] - pool-backed evaluation for a [`shared::models::Principal`]
//! - [`EffectivePermissions`] - resolved permission set with wildcard semantics
//! - [`hierarchy`] - inheritance graph traversal and cycle probing

pub mod evaluator;
pub mod hierarchy;

pub use evaluator::{
    EffectivePermissions, PermissionEvaluator, combine_row_filters, resolve_role_permissions,
};
pub use hierarchy::{detect_cycle, reachable_roles};
