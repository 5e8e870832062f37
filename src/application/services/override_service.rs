//! Override Service
//!
//! Management of folder and channel permission overrides.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::domain::services::{PermissionCache, PermissionChecker};
use crate::domain::value_objects::{Permission, Permissions, Scope};
use crate::domain::{
    NewPermissionOverride, OverrideScope, OverrideStore, OverrideTarget, PermissionOverride,
    RoleStore, ScopeRepository,
};
use crate::shared::error::AppError;

/// Override management operations.
///
/// Every operation requires MANAGE_PERMISSIONS on the scope it touches.
#[async_trait]
pub trait OverrideService: Send + Sync {
    /// Create or replace the override of one target on a folder or channel.
    async fn set_override(
        &self,
        scope: Scope,
        actor_id: i64,
        request: SetOverrideDto,
    ) -> Result<OverrideDto, OverrideError>;

    /// Remove the override of one target. Returns whether one existed.
    async fn clear_override(
        &self,
        scope: Scope,
        actor_id: i64,
        role_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<bool, OverrideError>;

    /// All overrides of a folder or channel, role targets first.
    async fn list_overrides(
        &self,
        scope: Scope,
        actor_id: i64,
    ) -> Result<Vec<OverrideDto>, OverrideError>;
}

// =============================================================================
// Data Transfer Objects
// =============================================================================

/// Set override request. Exactly one of `role_id` / `user_id` must be present.
#[derive(Debug, Clone, Default)]
pub struct SetOverrideDto {
    pub role_id: Option<i64>,
    pub user_id: Option<i64>,
    pub allowed: Permissions,
    pub denied: Permissions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverrideDto {
    pub id: i64,
    /// e.g. `channel:42`
    pub scope: String,
    pub role_id: Option<i64>,
    pub user_id: Option<i64>,
    /// Permission bitfields as strings (for JavaScript compatibility).
    pub allowed: String,
    pub denied: String,
    pub created_at: String,
}

impl From<PermissionOverride> for OverrideDto {
    fn from(o: PermissionOverride) -> Self {
        let (role_id, user_id) = o.target.to_columns();
        Self {
            id: o.id,
            scope: Scope::from(o.scope).to_string(),
            role_id,
            user_id,
            allowed: o.allowed.bits().to_string(),
            denied: o.denied.bits().to_string(),
            created_at: o.created_at.to_rfc3339(),
        }
    }
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("Folder or channel not found")]
    ScopeNotFound,

    #[error("Role not found")]
    RoleNotFound,

    #[error("Role does not belong to this server")]
    WrongServer,

    #[error("Permission denied")]
    Forbidden,

    #[error("Invalid override: {0}")]
    Invalid(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Service Implementation
// =============================================================================

pub struct OverrideServiceImpl<O, S, R>
where
    O: OverrideStore,
    S: ScopeRepository,
    R: RoleStore,
{
    override_repo: Arc<O>,
    scope_repo: Arc<S>,
    role_repo: Arc<R>,
    permissions: Arc<dyn PermissionChecker>,
    cache: Option<Arc<dyn PermissionCache>>,
}

impl<O, S, R> OverrideServiceImpl<O, S, R>
where
    O: OverrideStore,
    S: ScopeRepository,
    R: RoleStore,
{
    pub fn new(
        override_repo: Arc<O>,
        scope_repo: Arc<S>,
        role_repo: Arc<R>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        Self {
            override_repo,
            scope_repo,
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

    /// Resolve the override scope and its server, then check the actor.
    async fn authorize(
        &self,
        scope: Scope,
        actor_id: i64,
    ) -> Result<(OverrideScope, i64), OverrideError> {
        let override_scope = OverrideScope::try_from(scope)
            .map_err(|e| OverrideError::Invalid(e.to_string()))?;

        let server_id = self
            .scope_repo
            .server_id_of(scope)
            .await
            .map_err(|e| OverrideError::Internal(e.to_string()))?
            .ok_or(OverrideError::ScopeNotFound)?;

        if !self
            .permissions
            .has_permission(actor_id, scope, Permission::ManagePermissions)
            .await
        {
            return Err(OverrideError::Forbidden);
        }

        Ok((override_scope, server_id))
    }

    async fn check_role_target(
        &self,
        target: OverrideTarget,
        server_id: i64,
    ) -> Result<(), OverrideError> {
        let Some(role_id) = target.role_id() else {
            return Ok(());
        };
        let role = self
            .role_repo
            .find_role(role_id)
            .await
            .map_err(|e| OverrideError::Internal(e.to_string()))?
            .ok_or(OverrideError::RoleNotFound)?;

        if role.server_id != server_id {
            return Err(OverrideError::WrongServer);
        }
        Ok(())
    }

    async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate_all().await {
                warn!(error = %e, "Failed to invalidate permission cache");
            }
        }
    }
}

fn parse_target(role_id: Option<i64>, user_id: Option<i64>) -> Result<OverrideTarget, OverrideError> {
    OverrideTarget::from_columns(role_id, user_id).map_err(|e| OverrideError::Invalid(e.to_string()))
}

#[async_trait]
impl<O, S, R> OverrideService for OverrideServiceImpl<O, S, R>
where
    O: OverrideStore + 'static,
    S: ScopeRepository + 'static,
    R: RoleStore + 'static,
{
    #[instrument(skip(self, scope, request), fields(scope = %scope))]
    async fn set_override(
        &self,
        scope: Scope,
        actor_id: i64,
        request: SetOverrideDto,
    ) -> Result<OverrideDto, OverrideError> {
        // Reject malformed targets before touching any store
        let target = parse_target(request.role_id, request.user_id)?;
        let (override_scope, server_id) = self.authorize(scope, actor_id).await?;
        self.check_role_target(target, server_id).await?;

        let payload =
            NewPermissionOverride::new(override_scope, target, request.allowed, request.denied);

        let saved = self
            .override_repo
            .save_override(&payload)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => OverrideError::ScopeNotFound,
                AppError::Validation(msg) => OverrideError::Invalid(msg),
                other => OverrideError::Internal(other.to_string()),
            })?;

        info!(override_id = saved.id, target = ?saved.target, "Override saved");
        self.invalidate().await;
        Ok(OverrideDto::from(saved))
    }

    #[instrument(skip(self, scope), fields(scope = %scope))]
    async fn clear_override(
        &self,
        scope: Scope,
        actor_id: i64,
        role_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<bool, OverrideError> {
        let target = parse_target(role_id, user_id)?;
        let (override_scope, _) = self.authorize(scope, actor_id).await?;

        let removed = self
            .override_repo
            .delete_override(override_scope, target)
            .await
            .map_err(|e| OverrideError::Internal(e.to_string()))?;

        if removed {
            self.invalidate().await;
        }
        Ok(removed)
    }

    async fn list_overrides(
        &self,
        scope: Scope,
        actor_id: i64,
    ) -> Result<Vec<OverrideDto>, OverrideError> {
        let (override_scope, _) = self.authorize(scope, actor_id).await?;

        let overrides = self
            .override_repo
            .list_overrides(override_scope)
            .await
            .map_err(|e| OverrideError::Internal(e.to_string()))?;

        Ok(overrides.into_iter().map(OverrideDto::from).collect())
    }
}
