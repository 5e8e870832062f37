//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **CachedPermissionService**: cache-aside wrapper over the permission facade
//! - **RoleService**: Role management, member role assignments and personal grants
//! - **OverrideService**: Folder and channel permission overrides

pub mod cached_permission_service;
pub mod override_service;
pub mod role_service;

pub use cached_permission_service::CachedPermissionService;

// Re-export role service types
pub use role_service::{CreateRoleDto, RoleDto, RoleError, RoleService, RoleServiceImpl, UpdateRoleDto};

// Re-export override service types
pub use override_service::{
    OverrideDto, OverrideError, OverrideService, OverrideServiceImpl, SetOverrideDto,
};
