//! Role entity and the role/grant write store.
//!
//! Maps to the `server_roles` and `server_member_roles` tables in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Permission, Permissions};
use crate::shared::error::AppError;

/// Name of the role every member holds.
pub const EVERYONE_ROLE_NAME: &str = "everyone";

/// Name of the elevated role created for the server owner.
pub const OWNER_ROLE_NAME: &str = "Owner";

/// Position of the owner role. Positions only order roles for display.
pub const OWNER_ROLE_POSITION: i32 = 1000;

/// Represents a role in a server.
///
/// Maps to the `server_roles` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - server_id: BIGINT NOT NULL REFERENCES servers(id) ON DELETE CASCADE
/// - name: VARCHAR(100) NOT NULL
/// - color: INTEGER NULL (RGB color value)
/// - position: INTEGER NOT NULL DEFAULT 0
/// - permissions: BIGINT NOT NULL DEFAULT 0
/// - mentionable: BOOLEAN NOT NULL DEFAULT TRUE
/// - is_everyone: BOOLEAN NOT NULL DEFAULT FALSE (one per server)
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Primary key
    pub id: i64,

    /// Server this role belongs to
    pub server_id: i64,

    /// Role name (up to 100 characters)
    pub name: String,

    /// Role color (RGB integer, None for no color)
    pub color: Option<i32>,

    /// Display ordering; never consulted by permission resolution
    pub position: i32,

    /// Server-wide grant of this role
    pub permissions: Permissions,

    /// Whether this role can be mentioned
    pub mentionable: bool,

    /// Whether this is the server's everyone role
    pub is_everyone: bool,

    /// Inactive roles stay assigned but contribute nothing
    pub is_active: bool,

    /// Role creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Whether this role carries the administrator bit.
    pub fn is_admin(&self) -> bool {
        self.permissions.has(Permission::Administrator)
    }

    /// Get the color as a hex string (e.g., "#FF5733").
    pub fn color_hex(&self) -> Option<String> {
        self.color.map(|c| format!("#{:06X}", c))
    }
}

impl Default for Role {
    fn default() -> Self {
        Self {
            id: 0,
            server_id: 0,
            name: "new role".to_string(),
            color: None,
            position: 0,
            permissions: Permissions::NOTHING,
            mentionable: true,
            is_everyone: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Payload for inserting a role; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRole {
    pub server_id: i64,
    pub name: String,
    pub color: Option<i32>,
    pub position: i32,
    pub permissions: Permissions,
    pub mentionable: bool,
    pub is_everyone: bool,
}

impl NewRole {
    /// The everyone role created together with a server.
    pub fn everyone(server_id: i64) -> Self {
        Self {
            server_id,
            name: EVERYONE_ROLE_NAME.to_string(),
            color: Some(0xFFFFFF),
            position: 0,
            permissions: Permissions::EVERYONE_DEFAULT,
            mentionable: false,
            is_everyone: true,
        }
    }

    /// The owner role created together with a server.
    pub fn owner(server_id: i64) -> Self {
        Self {
            server_id,
            name: OWNER_ROLE_NAME.to_string(),
            color: Some(0xFF0000),
            position: OWNER_ROLE_POSITION,
            permissions: Permission::Administrator.into(),
            mentionable: true,
            is_everyone: false,
        }
    }
}

/// Write-side store for roles, role assignments and personal grants.
///
/// The permission facade never depends on this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Find a role by id, active or not.
    async fn find_role(&self, role_id: i64) -> Result<Option<Role>, AppError>;

    /// Find the everyone role of a server.
    async fn find_everyone_role(&self, server_id: i64) -> Result<Option<Role>, AppError>;

    /// Active roles of a server, position descending.
    async fn find_active_roles(&self, server_id: i64) -> Result<Vec<Role>, AppError>;

    /// Insert a role.
    async fn insert_role(&self, role: &NewRole) -> Result<Role, AppError>;

    /// Persist every mutable column of a role.
    async fn update_role(&self, role: &Role) -> Result<Role, AppError>;

    /// Insert the everyone and owner roles of a new server in one transaction.
    ///
    /// Returns `(everyone, owner)`.
    async fn insert_default_roles(&self, server_id: i64) -> Result<(Role, Role), AppError>;

    /// Attach a role to the member `(server_id, user_id)`. Idempotent.
    async fn assign_role(
        &self,
        server_id: i64,
        user_id: i64,
        role_id: i64,
        assigned_by: i64,
    ) -> Result<(), AppError>;

    /// Detach a role from a member. Returns whether an assignment was removed.
    async fn unassign_role(&self, server_id: i64, user_id: i64, role_id: i64)
        -> Result<bool, AppError>;

    /// Replace a member's personal grant.
    async fn set_personal_permissions(
        &self,
        server_id: i64,
        user_id: i64,
        permissions: Permissions,
    ) -> Result<(), AppError>;
}
