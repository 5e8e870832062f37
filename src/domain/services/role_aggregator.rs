//! Active role aggregation.

use crate::domain::entities::{Member, Role};
use crate::domain::value_objects::{Permission, Permissions};

/// The subset of a member's assigned roles that is currently active.
///
/// Inactive roles stay assigned to the member but contribute nothing to any
/// scope. Every resolver works from this view.
#[derive(Debug, Clone)]
pub struct ActiveRoles<'a> {
    roles: Vec<&'a Role>,
}

impl<'a> ActiveRoles<'a> {
    pub fn of(member: &'a Member) -> Self {
        Self::from_roles(&member.roles)
    }

    pub fn from_roles(roles: &'a [Role]) -> Self {
        Self {
            roles: roles.iter().filter(|r| r.is_active).collect(),
        }
    }

    /// Union of the server-wide grants of every active role.
    pub fn base(&self) -> Permissions {
        self.roles
            .iter()
            .fold(Permissions::NOTHING, |acc, role| acc | role.permissions)
    }

    /// Whether any active role carries ADMINISTRATOR.
    pub fn is_admin(&self) -> bool {
        self.roles
            .iter()
            .any(|role| role.permissions.has(Permission::Administrator))
    }

    pub fn ids(&self) -> Vec<i64> {
        self.roles.iter().map(|r| r.id).collect()
    }

    pub fn contains(&self, role_id: i64) -> bool {
        self.roles.iter().any(|r| r.id == role_id)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Active roles, highest position first.
    pub fn sorted_by_position(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.iter().map(|r| (*r).clone()).collect();
        roles.sort_by(|a, b| b.position.cmp(&a.position).then(a.id.cmp(&b.id)));
        roles
    }
}
