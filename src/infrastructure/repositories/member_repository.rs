//! Member Repository Implementation
//!
//! PostgreSQL implementation of the MemberRepository trait.
//! Loads active memberships together with their roles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use super::role_repository::{RoleRow, ROLE_COLUMNS};
use crate::domain::{Member, MemberRepository, Permissions, Role};
use crate::shared::error::AppError;

const MEMBER_COLUMNS: &str = "m.id, m.server_id, m.user_id, m.nickname, m.personal_permissions, \
     m.is_active, m.joined_at, m.left_at";

/// Database row representation matching the server_members table schema.
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: i64,
    server_id: i64,
    user_id: i64,
    nickname: Option<String>,
    personal_permissions: i64,
    is_active: bool,
    joined_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
}

impl MemberRow {
    /// Convert database row to domain Member entity.
    /// Note: roles are loaded separately.
    fn into_member(self, roles: Vec<Role>) -> Member {
        Member {
            id: self.id,
            server_id: self.server_id,
            user_id: self.user_id,
            nickname: self.nickname,
            personal_permissions: Permissions::from_storage(self.personal_permissions),
            is_active: self.is_active,
            joined_at: self.joined_at,
            left_at: self.left_at,
            roles,
        }
    }
}

/// PostgreSQL member repository implementation.
#[derive(Clone)]
pub struct PgMemberRepository {
    pool: PgPool,
}

impl PgMemberRepository {
    /// Create a new PgMemberRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Assigned roles of a member plus the server's everyone role, which every
    /// member holds implicitly. Inactive roles are included.
    async fn load_member_roles(&self, member_id: i64, server_id: i64) -> Result<Vec<Role>, AppError> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            r#"
            SELECT {ROLE_COLUMNS}
            FROM server_roles r
            WHERE r.server_id = $2
              AND (r.is_everyone
                   OR r.id IN (SELECT role_id FROM server_member_roles WHERE member_id = $1))
            ORDER BY r.position DESC, r.id
            "#
        ))
        .bind(member_id)
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RoleRow::into_role).collect())
    }

    async fn with_roles(&self, row: Option<MemberRow>) -> Result<Option<Member>, AppError> {
        match row {
            Some(r) => {
                let roles = self.load_member_roles(r.id, r.server_id).await?;
                Ok(Some(r.into_member(roles)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MemberRepository for PgMemberRepository {
    #[instrument(skip(self))]
    async fn find_active(&self, user_id: i64, server_id: i64) -> Result<Option<Member>, AppError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM server_members m
            WHERE m.user_id = $1 AND m.server_id = $2 AND m.is_active
            "#
        ))
        .bind(user_id)
        .bind(server_id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_roles(row).await
    }

    #[instrument(skip(self))]
    async fn find_active_by_folder(
        &self,
        user_id: i64,
        folder_id: i64,
    ) -> Result<Option<Member>, AppError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM server_members m
            INNER JOIN channel_folders f ON f.server_id = m.server_id
            WHERE m.user_id = $1 AND f.id = $2 AND m.is_active
            "#
        ))
        .bind(user_id)
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_roles(row).await
    }

    #[instrument(skip(self))]
    async fn find_active_by_channel(
        &self,
        user_id: i64,
        channel_id: i64,
    ) -> Result<Option<Member>, AppError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM server_members m
            INNER JOIN channel_folders f ON f.server_id = m.server_id
            INNER JOIN channels c ON c.folder_id = f.id
            WHERE m.user_id = $1 AND c.id = $2 AND m.is_active
            "#
        ))
        .bind(user_id)
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_roles(row).await
    }
}
