//! Service layer
//!
//! Read-side helpers consumed by admin-facing callers.

pub mod query;

pub use query::{RoleOption, RoleQueryService};
