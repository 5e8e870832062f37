//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **PgMemberRepository** - Active memberships with their roles (`MemberRepository`)
//! - **PgOverrideRepository** - Folder and channel overrides (`OverrideRepository`, `OverrideStore`)
//! - **PgScopeRepository** - Server/folder/channel hierarchy (`ScopeRepository`)
//! - **PgRoleRepository** - Roles, assignments and personal grants (`RoleStore`)
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chat_permissions::domain::services::PermissionService;
//! use chat_permissions::infrastructure::repositories::*;
//!
//! let permissions = PermissionService::new(
//!     Arc::new(PgMemberRepository::new(pool.clone())),
//!     Arc::new(PgOverrideRepository::new(pool.clone())),
//!     Arc::new(PgScopeRepository::new(pool.clone())),
//! );
//! ```

pub mod member_repository;
pub mod override_repository;
pub mod role_repository;
pub mod scope_repository;

pub use member_repository::PgMemberRepository;
pub use override_repository::PgOverrideRepository;
pub use role_repository::PgRoleRepository;
pub use scope_repository::PgScopeRepository;
