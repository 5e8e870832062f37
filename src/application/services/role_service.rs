//! Role Service
//!
//! Handles role management: the default roles of a new server, role
//! create/update/deactivate, member role assignments and personal grants.
//! Every successful write drops cached permission masks.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::domain::services::{PermissionCache, PermissionChecker};
use crate::domain::value_objects::{Permission, Permissions, Scope};
use crate::domain::{NewRole, Role, RoleStore};
use crate::shared::error::AppError;

/// Role service trait defining all role management operations.
#[async_trait]
pub trait RoleService: Send + Sync {
    /// Create the everyone and owner roles of a freshly created server.
    ///
    /// Returns `(everyone, owner)`. Both are written or neither is.
    async fn create_server_roles(&self, server_id: i64) -> Result<(RoleDto, RoleDto), RoleError>;

    /// Create a new role in a server.
    async fn create_role(
        &self,
        server_id: i64,
        actor_id: i64,
        request: CreateRoleDto,
    ) -> Result<RoleDto, RoleError>;

    /// Get a role by its ID.
    async fn get_role(&self, role_id: i64) -> Result<RoleDto, RoleError>;

    /// Active roles of a server, highest position first.
    async fn get_roles_by_server(&self, server_id: i64) -> Result<Vec<RoleDto>, RoleError>;

    /// Update a role. Absent fields are left untouched.
    async fn update_role(
        &self,
        role_id: i64,
        actor_id: i64,
        update: UpdateRoleDto,
    ) -> Result<RoleDto, RoleError>;

    /// Soft-delete a role. It stays assigned but stops contributing.
    async fn deactivate_role(&self, role_id: i64, actor_id: i64) -> Result<(), RoleError>;

    /// Assign a role to a member.
    async fn assign_role(
        &self,
        server_id: i64,
        user_id: i64,
        role_id: i64,
        actor_id: i64,
    ) -> Result<(), RoleError>;

    /// Remove a role from a member.
    async fn remove_role(
        &self,
        server_id: i64,
        user_id: i64,
        role_id: i64,
        actor_id: i64,
    ) -> Result<(), RoleError>;

    /// Replace the personal grant of a member.
    async fn set_personal_permissions(
        &self,
        server_id: i64,
        user_id: i64,
        permissions: Permissions,
        actor_id: i64,
    ) -> Result<(), RoleError>;
}

// =============================================================================
// Data Transfer Objects
// =============================================================================

/// Create role request DTO.
#[derive(Debug, Clone, Default)]
pub struct CreateRoleDto {
    /// Role name (1-100 characters).
    pub name: String,
    /// Server-wide grant.
    pub permissions: Permissions,
    /// Role color as RGB integer.
    pub color: Option<i32>,
    /// Display position. Does not affect resolution.
    pub position: Option<i32>,
    /// Whether this role can be mentioned.
    pub mentionable: Option<bool>,
}

/// Role data transfer object.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleDto {
    pub id: i64,
    pub server_id: i64,
    pub name: String,
    /// Permission bitfield as string (for JavaScript compatibility).
    pub permissions: String,
    pub position: i32,
    /// Role color as `#RRGGBB`.
    pub color: Option<String>,
    pub mentionable: bool,
    pub is_everyone: bool,
    pub is_active: bool,
    pub created_at: String,
}

impl From<Role> for RoleDto {
    fn from(role: Role) -> Self {
        Self {
            color: role.color_hex(),
            id: role.id,
            server_id: role.server_id,
            name: role.name,
            permissions: role.permissions.bits().to_string(),
            position: role.position,
            mentionable: role.mentionable,
            is_everyone: role.is_everyone,
            is_active: role.is_active,
            created_at: role.created_at.to_rfc3339(),
        }
    }
}

/// Update role request DTO.
#[derive(Debug, Clone, Default)]
pub struct UpdateRoleDto {
    pub name: Option<String>,
    pub permissions: Option<Permissions>,
    /// `Some(None)` clears the color.
    pub color: Option<Option<i32>>,
    pub position: Option<i32>,
    pub mentionable: Option<bool>,
    /// `Some(false)` deactivates, `Some(true)` reactivates.
    pub active: Option<bool>,
}

// =============================================================================
// Error Types
// =============================================================================

/// Role service errors.
#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("Role not found")]
    NotFound,

    #[error("Server not found")]
    ServerNotFound,

    #[error("Member not found")]
    MemberNotFound,

    #[error("Permission denied")]
    Forbidden,

    #[error("Role does not belong to this server")]
    WrongServer,

    #[error("Cannot deactivate @everyone role")]
    CannotDeactivateEveryoneRole,

    #[error("Cannot assign or remove @everyone role")]
    CannotAssignEveryoneRole,

    #[error("Cannot assign an inactive role")]
    RoleInactive,

    #[error("Invalid role name: {0}")]
    InvalidName(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Service Implementation
// =============================================================================

/// RoleService implementation over a [`RoleStore`].
pub struct RoleServiceImpl<R>
where
    R: RoleStore,
{
    role_repo: Arc<R>,
    permissions: Arc<dyn PermissionChecker>,
    cache: Option<Arc<dyn PermissionCache>>,
}

impl<R> RoleServiceImpl<R>
where
    R: RoleStore,
{
    /// Create a new RoleServiceImpl.
    pub fn new(role_repo: Arc<R>, permissions: Arc<dyn PermissionChecker>) -> Self {
        Self {
            role_repo,
            permissions,
            cache: None,
        }
    }

    /// Drop cached masks after every write.
    pub fn with_cache(mut self, cache: Arc<dyn PermissionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn validate_name(name: &str) -> Result<(), RoleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoleError::InvalidName("Name cannot be empty".to_string()));
        }
        if name.chars().count() > 100 {
            return Err(RoleError::InvalidName(
                "Name must be at most 100 characters".to_string(),
            ));
        }
        Ok(())
    }

    async fn require(
        &self,
        actor_id: i64,
        server_id: i64,
        permission: Permission,
    ) -> Result<(), RoleError> {
        if self
            .permissions
            .has_permission(actor_id, Scope::Server(server_id), permission)
            .await
        {
            Ok(())
        } else {
            Err(RoleError::Forbidden)
        }
    }

    async fn load_role(&self, role_id: i64) -> Result<Role, RoleError> {
        self.role_repo
            .find_role(role_id)
            .await
            .map_err(|e| RoleError::Internal(e.to_string()))?
            .ok_or(RoleError::NotFound)
    }

    /// Load a role and check that it belongs to `server_id`.
    async fn load_server_role(&self, server_id: i64, role_id: i64) -> Result<Role, RoleError> {
        let role = self.load_role(role_id).await?;
        if role.server_id != server_id {
            return Err(RoleError::WrongServer);
        }
        Ok(role)
    }

    async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate_all().await {
                warn!(error = %e, "Failed to invalidate permission cache");
            }
        }
    }
}

/// Store failures that carry meaning for the caller keep it.
fn write_error(e: AppError) -> RoleError {
    match e {
        AppError::NotFound(_) => RoleError::MemberNotFound,
        AppError::Conflict(msg) => RoleError::Conflict(msg),
        other => RoleError::Internal(other.to_string()),
    }
}

#[async_trait]
impl<R> RoleService for RoleServiceImpl<R>
where
    R: RoleStore + 'static,
{
    #[instrument(skip(self))]
    async fn create_server_roles(&self, server_id: i64) -> Result<(RoleDto, RoleDto), RoleError> {
        let (everyone, owner) = self
            .role_repo
            .insert_default_roles(server_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => RoleError::ServerNotFound,
                other => write_error(other),
            })?;

        info!(everyone_id = everyone.id, owner_id = owner.id, "Default roles created");
        self.invalidate().await;
        Ok((RoleDto::from(everyone), RoleDto::from(owner)))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_role(
        &self,
        server_id: i64,
        actor_id: i64,
        request: CreateRoleDto,
    ) -> Result<RoleDto, RoleError> {
        Self::validate_name(&request.name)?;
        self.require(actor_id, server_id, Permission::ManageRoles).await?;

        let role = NewRole {
            server_id,
            name: request.name.trim().to_string(),
            color: request.color,
            position: request.position.unwrap_or(0),
            permissions: request.permissions,
            mentionable: request.mentionable.unwrap_or(true),
            is_everyone: false,
        };

        let created = self
            .role_repo
            .insert_role(&role)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => RoleError::ServerNotFound,
                other => write_error(other),
            })?;

        self.invalidate().await;
        Ok(RoleDto::from(created))
    }

    async fn get_role(&self, role_id: i64) -> Result<RoleDto, RoleError> {
        self.load_role(role_id).await.map(RoleDto::from)
    }

    async fn get_roles_by_server(&self, server_id: i64) -> Result<Vec<RoleDto>, RoleError> {
        let roles = self
            .role_repo
            .find_active_roles(server_id)
            .await
            .map_err(|e| RoleError::Internal(e.to_string()))?;

        Ok(roles.into_iter().map(RoleDto::from).collect())
    }

    #[instrument(skip(self, update))]
    async fn update_role(
        &self,
        role_id: i64,
        actor_id: i64,
        update: UpdateRoleDto,
    ) -> Result<RoleDto, RoleError> {
        let mut role = self.load_role(role_id).await?;
        self.require(actor_id, role.server_id, Permission::ManageRoles).await?;

        if role.is_everyone && update.active == Some(false) {
            return Err(RoleError::CannotDeactivateEveryoneRole);
        }

        if let Some(name) = update.name {
            Self::validate_name(&name)?;
            role.name = name.trim().to_string();
        }
        if let Some(permissions) = update.permissions {
            role.permissions = permissions;
        }
        if let Some(color) = update.color {
            role.color = color;
        }
        if let Some(position) = update.position {
            role.position = position;
        }
        if let Some(mentionable) = update.mentionable {
            role.mentionable = mentionable;
        }
        if let Some(active) = update.active {
            role.is_active = active;
        }

        let updated = self
            .role_repo
            .update_role(&role)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => RoleError::NotFound,
                AppError::Validation(_) => RoleError::CannotDeactivateEveryoneRole,
                other => write_error(other),
            })?;

        self.invalidate().await;
        Ok(RoleDto::from(updated))
    }

    #[instrument(skip(self))]
    async fn deactivate_role(&self, role_id: i64, actor_id: i64) -> Result<(), RoleError> {
        self.update_role(
            role_id,
            actor_id,
            UpdateRoleDto {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn assign_role(
        &self,
        server_id: i64,
        user_id: i64,
        role_id: i64,
        actor_id: i64,
    ) -> Result<(), RoleError> {
        let role = self.load_server_role(server_id, role_id).await?;
        // Every member already holds it
        if role.is_everyone {
            return Err(RoleError::CannotAssignEveryoneRole);
        }
        if !role.is_active {
            return Err(RoleError::RoleInactive);
        }
        self.require(actor_id, server_id, Permission::ManageRoles).await?;

        self.role_repo
            .assign_role(server_id, user_id, role_id, actor_id)
            .await
            .map_err(write_error)?;

        self.invalidate().await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_role(
        &self,
        server_id: i64,
        user_id: i64,
        role_id: i64,
        actor_id: i64,
    ) -> Result<(), RoleError> {
        let role = self.load_server_role(server_id, role_id).await?;
        if role.is_everyone {
            return Err(RoleError::CannotAssignEveryoneRole);
        }
        self.require(actor_id, server_id, Permission::ManageRoles).await?;

        let removed = self
            .role_repo
            .unassign_role(server_id, user_id, role_id)
            .await
            .map_err(write_error)?;

        if removed {
            self.invalidate().await;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_personal_permissions(
        &self,
        server_id: i64,
        user_id: i64,
        permissions: Permissions,
        actor_id: i64,
    ) -> Result<(), RoleError> {
        self.require(actor_id, server_id, Permission::ManagePermissions)
            .await?;

        self.role_repo
            .set_personal_permissions(server_id, user_id, permissions)
            .await
            .map_err(write_error)?;

        self.invalidate().await;
        Ok(())
    }
}
