//! # Domain Entities
//!
//! Business objects the permission engine reasons about. All entities map
//! directly to their corresponding database tables.
//!
//! - **Role**: a server-wide grant assignable to members
//! - **Member**: a user's membership in a specific server
//! - **Folder / Channel**: the scope hierarchy below a server
//! - **PermissionOverride**: a folder or channel allow/deny pair for one role or one user
//!
//! ## Repository Traits
//!
//! Read traits (`MemberRepository`, `OverrideRepository`, `ScopeRepository`)
//! are all the permission facade depends on. Write traits (`RoleStore`,
//! `OverrideStore`) back the application services. Implementations live in
//! the infrastructure layer.

mod channel;
mod member;
mod permission_override;
mod role;

pub use channel::{Channel, ChannelType, Folder, ScopeRepository};
pub use member::{Member, MemberRepository};
pub use permission_override::{
    InvalidTarget, NewPermissionOverride, OverrideRepository, OverrideScope, OverrideStore,
    OverrideTarget, PermissionOverride,
};
pub use role::{NewRole, Role, RoleStore, EVERYONE_ROLE_NAME, OWNER_ROLE_NAME, OWNER_ROLE_POSITION};

#[cfg(test)]
pub use channel::MockScopeRepository;
#[cfg(test)]
pub use member::MockMemberRepository;
#[cfg(test)]
pub use permission_override::{MockOverrideRepository, MockOverrideStore};
#[cfg(test)]
pub use role::MockRoleStore;
