//! Server Member entity and the membership read repository.
//!
//! Maps to the `server_members` and `server_member_roles` tables in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::domain::value_objects::Permissions;
use crate::shared::error::AppError;

/// Represents a user's membership in a server.
///
/// Maps to the `server_members` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - server_id: BIGINT NOT NULL REFERENCES servers(id) ON DELETE CASCADE
/// - user_id: BIGINT NOT NULL (UNIQUE with server_id)
/// - nickname: VARCHAR(32) NULL
/// - personal_permissions: BIGINT NOT NULL DEFAULT 0
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - joined_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - left_at: TIMESTAMPTZ NULL
///
/// Role assignments are stored in the `server_member_roles` junction table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Primary key
    pub id: i64,

    /// Server ID
    pub server_id: i64,

    /// User ID
    pub user_id: i64,

    /// Server-specific nickname
    pub nickname: Option<String>,

    /// Grants held by this member independently of any role
    pub personal_permissions: Permissions,

    /// False once the member left, was kicked or was banned
    pub is_active: bool,

    /// When the user joined the server
    pub joined_at: DateTime<Utc>,

    /// When the user left the server
    pub left_at: Option<DateTime<Utc>>,

    /// Assigned roles, active or not (loaded from server_member_roles)
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Member {
    /// Create an active member with no roles and no personal grant.
    pub fn new(id: i64, server_id: i64, user_id: i64) -> Self {
        Self {
            id,
            server_id,
            user_id,
            nickname: None,
            personal_permissions: Permissions::NOTHING,
            is_active: true,
            joined_at: Utc::now(),
            left_at: None,
            roles: Vec::new(),
        }
    }
}

/// Membership lookups consumed by the permission facade.
///
/// Every method returns the member only while it is active; folder and
/// channel variants join through to the owning server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Active membership of a user in a server.
    async fn find_active(&self, user_id: i64, server_id: i64) -> Result<Option<Member>, AppError>;

    /// Active membership in the server owning a folder.
    async fn find_active_by_folder(
        &self,
        user_id: i64,
        folder_id: i64,
    ) -> Result<Option<Member>, AppError>;

    /// Active membership in the server owning a channel.
    async fn find_active_by_channel(
        &self,
        user_id: i64,
        channel_id: i64,
    ) -> Result<Option<Member>, AppError>;
}
