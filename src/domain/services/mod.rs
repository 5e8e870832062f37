//! # Domain Services
//!
//! Permission resolution.
//!
//! - **ActiveRoles**: the role aggregator shared by every resolver
//! - **resolver**: pure server, folder and channel resolution
//! - **PermissionService**: the decision facade, implementing `PermissionChecker`
//! - **PermissionCache**: contract for caching resolved masks

mod permission_cache;
mod permission_service;
mod resolver;
mod role_aggregator;

pub use permission_cache::{CacheRead, PermissionCache};
pub use permission_service::{PermissionChecker, PermissionService};
pub use resolver::{resolve_channel, resolve_folder, resolve_server, ScopeResolution};
pub use role_aggregator::ActiveRoles;

#[cfg(test)]
pub use permission_cache::MockPermissionCache;
#[cfg(test)]
pub use permission_service::MockPermissionChecker;
