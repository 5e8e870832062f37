//! Folder and channel permission overrides.
//!
//! Maps to the `folder_permission_overrides` and `channel_permission_overrides`
//! tables. Both tables share one shape:
//! - id: BIGSERIAL PRIMARY KEY
//! - folder_id / channel_id: BIGINT NOT NULL (ON DELETE CASCADE)
//! - role_id: BIGINT NULL REFERENCES server_roles(id) ON DELETE CASCADE
//! - user_id: BIGINT NULL
//! - allowed: BIGINT NOT NULL DEFAULT 0
//! - denied: BIGINT NOT NULL DEFAULT 0
//! - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! - CHECK ((role_id IS NULL) <> (user_id IS NULL))

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Permissions, Scope};
use crate::shared::error::AppError;

/// The scope an override is attached to. Servers carry no overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OverrideScope {
    Folder(i64),
    Channel(i64),
}

impl OverrideScope {
    pub const fn id(&self) -> i64 {
        match self {
            Self::Folder(id) | Self::Channel(id) => *id,
        }
    }
}

impl From<OverrideScope> for Scope {
    fn from(scope: OverrideScope) -> Self {
        match scope {
            OverrideScope::Folder(id) => Scope::Folder(id),
            OverrideScope::Channel(id) => Scope::Channel(id),
        }
    }
}

impl TryFrom<Scope> for OverrideScope {
    type Error = AppError;

    fn try_from(scope: Scope) -> Result<Self, Self::Error> {
        match scope {
            Scope::Folder(id) => Ok(Self::Folder(id)),
            Scope::Channel(id) => Ok(Self::Channel(id)),
            Scope::Server(_) => Err(AppError::Validation(
                "overrides can only be attached to a folder or a channel".to_string(),
            )),
        }
    }
}

/// Who an override applies to: exactly one role or exactly one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum OverrideTarget {
    Role(i64),
    User(i64),
}

/// Raised when a `(role_id, user_id)` column pair does not name exactly one target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTarget {
    #[error("override targets both role {role_id} and user {user_id}")]
    Both { role_id: i64, user_id: i64 },

    #[error("override has neither a role nor a user target")]
    Neither,
}

impl OverrideTarget {
    /// Validate an untyped column pair.
    ///
    /// This is the only place the role/user exclusivity is checked; every
    /// write payload and every decoded row goes through it.
    pub fn from_columns(role_id: Option<i64>, user_id: Option<i64>) -> Result<Self, InvalidTarget> {
        match (role_id, user_id) {
            (Some(role_id), None) => Ok(Self::Role(role_id)),
            (None, Some(user_id)) => Ok(Self::User(user_id)),
            (Some(role_id), Some(user_id)) => Err(InvalidTarget::Both { role_id, user_id }),
            (None, None) => Err(InvalidTarget::Neither),
        }
    }

    /// Split back into `(role_id, user_id)` columns.
    pub const fn to_columns(&self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Role(id) => (Some(*id), None),
            Self::User(id) => (None, Some(*id)),
        }
    }

    pub const fn role_id(&self) -> Option<i64> {
        match self {
            Self::Role(id) => Some(*id),
            Self::User(_) => None,
        }
    }

    pub const fn user_id(&self) -> Option<i64> {
        match self {
            Self::Role(_) => None,
            Self::User(id) => Some(*id),
        }
    }
}

/// A stored allow/deny pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionOverride {
    pub id: i64,
    pub scope: OverrideScope,
    pub target: OverrideTarget,
    pub allowed: Permissions,
    pub denied: Permissions,
    pub created_at: DateTime<Utc>,
}

/// Write payload; saving replaces any existing row for the same scope and target.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPermissionOverride {
    pub scope: OverrideScope,
    pub target: OverrideTarget,
    pub allowed: Permissions,
    pub denied: Permissions,
}

impl NewPermissionOverride {
    pub fn new(
        scope: OverrideScope,
        target: OverrideTarget,
        allowed: Permissions,
        denied: Permissions,
    ) -> Self {
        Self {
            scope,
            target,
            allowed,
            denied,
        }
    }
}

/// Override lookups consumed by the permission facade.
///
/// The `*_for_roles` methods return only overrides targeting one of the
/// given roles; an empty slice yields an empty result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverrideRepository: Send + Sync {
    async fn folder_overrides_for_roles(
        &self,
        folder_id: i64,
        role_ids: &[i64],
    ) -> Result<Vec<PermissionOverride>, AppError>;

    async fn folder_override_for_user(
        &self,
        folder_id: i64,
        user_id: i64,
    ) -> Result<Option<PermissionOverride>, AppError>;

    async fn channel_overrides_for_roles(
        &self,
        channel_id: i64,
        role_ids: &[i64],
    ) -> Result<Vec<PermissionOverride>, AppError>;

    async fn channel_override_for_user(
        &self,
        channel_id: i64,
        user_id: i64,
    ) -> Result<Option<PermissionOverride>, AppError>;
}

/// Write-side store for overrides.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// Insert or replace the override for `(scope, target)`.
    async fn save_override(
        &self,
        payload: &NewPermissionOverride,
    ) -> Result<PermissionOverride, AppError>;

    /// Delete the override for `(scope, target)`. Returns whether a row was removed.
    async fn delete_override(
        &self,
        scope: OverrideScope,
        target: OverrideTarget,
    ) -> Result<bool, AppError>;

    /// Every override attached to a scope, role targets first.
    async fn list_overrides(&self, scope: OverrideScope)
        -> Result<Vec<PermissionOverride>, AppError>;
}
