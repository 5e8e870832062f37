//! Pure scope resolvers.
//!
//! Nothing here performs I/O: the facade loads the member and the relevant
//! overrides and hands them over. Deny always beats allow inside a scope, and
//! a folder's denies reach its channels unless a channel override allows the
//! bit again.

use serde::{Deserialize, Serialize};

use super::role_aggregator::ActiveRoles;
use crate::domain::entities::{OverrideTarget, PermissionOverride};
use crate::domain::value_objects::{Permission, Permissions};

/// Merged allow and deny masks of one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeResolution {
    pub allowed: Permissions,
    pub denied: Permissions,
}

impl ScopeResolution {
    pub const fn new(allowed: Permissions, denied: Permissions) -> Self {
        Self { allowed, denied }
    }

    /// `allowed & !denied`
    pub fn effective(&self) -> Permissions {
        self.allowed.difference(self.denied)
    }

    /// Single-bit decision; an explicit deny wins regardless of allow sources.
    pub fn allows(&self, permission: Permission) -> bool {
        !self.denied.has(permission) && self.allowed.has(permission)
    }
}

/// Allow/deny bits collected from the overrides of one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct OverrideMasks {
    allowed: Permissions,
    denied: Permissions,
}

impl OverrideMasks {
    /// Merge the overrides that apply to this member: role overrides whose
    /// role is active for the member, and the member's own user override.
    fn collect(
        roles: &ActiveRoles<'_>,
        user_id: i64,
        role_overrides: &[PermissionOverride],
        user_override: Option<&PermissionOverride>,
    ) -> Self {
        let mut masks = Self::default();
        let applicable = role_overrides
            .iter()
            .filter(|o| matches!(o.target, OverrideTarget::Role(id) if roles.contains(id)))
            .chain(user_override.filter(|o| o.target == OverrideTarget::User(user_id)));
        for o in applicable {
            masks.allowed |= o.allowed;
            masks.denied |= o.denied;
        }
        masks
    }
}

/// Server scope: active role grants plus personal grants. No overrides exist here.
pub fn resolve_server(roles: &ActiveRoles<'_>, personal: Permissions) -> Permissions {
    roles.base() | personal
}

/// Folder scope.
///
/// `allowed` is the role floor plus every applicable override allow plus the
/// personal grant; `denied` is the union of the applicable override denies.
pub fn resolve_folder(
    roles: &ActiveRoles<'_>,
    user_id: i64,
    personal: Permissions,
    role_overrides: &[PermissionOverride],
    user_override: Option<&PermissionOverride>,
) -> ScopeResolution {
    let masks = OverrideMasks::collect(roles, user_id, role_overrides, user_override);
    ScopeResolution {
        allowed: roles.base() | masks.allowed | personal,
        denied: masks.denied,
    }
}

/// Channel scope, layered on the resolution of the parent folder.
///
/// The folder's effective mask is the floor. Folder denies stay denied unless
/// an applicable channel override allows the bit, so a channel can grant an
/// exception to a folder deny while personal grants alone cannot.
pub fn resolve_channel(
    folder: &ScopeResolution,
    roles: &ActiveRoles<'_>,
    user_id: i64,
    personal: Permissions,
    role_overrides: &[PermissionOverride],
    user_override: Option<&PermissionOverride>,
) -> ScopeResolution {
    let masks = OverrideMasks::collect(roles, user_id, role_overrides, user_override);
    let inherited_denied = folder.denied.difference(masks.allowed);
    ScopeResolution {
        allowed: folder.effective() | masks.allowed | personal,
        denied: masks.denied | inherited_denied,
    }
}
