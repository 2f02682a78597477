//! Role & Data-Permission Engine
//!
//! # 架构概述
//!
//! Business-role management with row-level data permissions. The engine
//! exposes a service contract consumed by an admin layer (CRUD on roles and
//! rules) and by authorization call sites (effective permission set, row
//! filter per entity type).
//!
//! # 模块结构
//!
//! ```text
//! role-engine/src/
//! ├── db/            # 数据库层: SQLite pool + migrations
//! │   └── repository # role / data-permission CRUD
//! ├── auth/          # 权限评估: evaluator, hierarchy resolution
//! └── services/      # 角色查询服务 (selection UIs)
//! ```

pub mod auth;
pub mod db;
pub mod services;

// Re-export 公共类型
pub use auth::{EffectivePermissions, PermissionEvaluator};
pub use db::DbService;
pub use db::repository::{RepoError, RepoResult};
pub use services::{RoleOption, RoleQueryService};
