//! Role Repository Implementation
//!
//! PostgreSQL implementation of the RoleStore trait.
//! Handles server roles, role assignments and personal grants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use crate::domain::{NewRole, Permissions, Role, RoleStore};
use crate::shared::error::AppError;

/// Column list shared by every role query.
pub(crate) const ROLE_COLUMNS: &str = "r.id, r.server_id, r.name, r.color, r.position, r.permissions, \
     r.mentionable, r.is_everyone, r.is_active, r.created_at";

/// Database row representation matching the server_roles table schema.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RoleRow {
    id: i64,
    server_id: i64,
    name: String,
    color: Option<i32>,
    position: i32,
    permissions: i64,
    mentionable: bool,
    is_everyone: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl RoleRow {
    /// Convert database row to domain Role entity.
    pub(crate) fn into_role(self) -> Role {
        Role {
            id: self.id,
            server_id: self.server_id,
            name: self.name,
            color: self.color,
            position: self.position,
            permissions: Permissions::from_storage(self.permissions),
            mentionable: self.mentionable,
            is_everyone: self.is_everyone,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL role repository implementation.
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    /// Create a new PgRoleRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_in(tx: &mut Transaction<'_, Postgres>, role: &NewRole) -> Result<Role, AppError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            r#"
            INSERT INTO server_roles AS r
                (server_id, name, color, position, permissions, mentionable, is_everyone)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(role.server_id)
        .bind(&role.name)
        .bind(role.color)
        .bind(role.position)
        .bind(role.permissions.to_storage())
        .bind(role.mentionable)
        .bind(role.is_everyone)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_role_write_error)?;

        Ok(row.into_role())
    }

    async fn member_id(&self, server_id: i64, user_id: i64) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM server_members
            WHERE server_id = $1 AND user_id = $2
            "#,
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Member not found in server {} for user {}",
                server_id, user_id
            ))
        })
    }
}

fn map_role_write_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Server already has an everyone role".to_string())
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            AppError::NotFound("Server not found".to_string())
        }
        sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
            AppError::Validation("The everyone role cannot be deactivated".to_string())
        }
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl RoleStore for PgRoleRepository {
    async fn find_role(&self, role_id: i64) -> Result<Option<Role>, AppError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM server_roles r WHERE r.id = $1"
        ))
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RoleRow::into_role))
    }

    async fn find_everyone_role(&self, server_id: i64) -> Result<Option<Role>, AppError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM server_roles r WHERE r.server_id = $1 AND r.is_everyone"
        ))
        .bind(server_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RoleRow::into_role))
    }

    async fn find_active_roles(&self, server_id: i64) -> Result<Vec<Role>, AppError> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            r#"
            SELECT {ROLE_COLUMNS}
            FROM server_roles r
            WHERE r.server_id = $1 AND r.is_active
            ORDER BY r.position DESC, r.id
            "#
        ))
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RoleRow::into_role).collect())
    }

    #[instrument(skip(self, role), fields(server_id = role.server_id))]
    async fn insert_role(&self, role: &NewRole) -> Result<Role, AppError> {
        let mut tx = self.pool.begin().await?;
        let role = Self::insert_in(&mut tx, role).await?;
        tx.commit().await?;
        Ok(role)
    }

    #[instrument(skip(self, role), fields(role_id = role.id))]
    async fn update_role(&self, role: &Role) -> Result<Role, AppError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            r#"
            UPDATE server_roles AS r
            SET name = $2, color = $3, position = $4, permissions = $5,
                mentionable = $6, is_active = $7
            WHERE r.id = $1
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(role.id)
        .bind(&role.name)
        .bind(role.color)
        .bind(role.position)
        .bind(role.permissions.to_storage())
        .bind(role.mentionable)
        .bind(role.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_role_write_error)?;

        row.map(RoleRow::into_role)
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", role.id)))
    }

    #[instrument(skip(self))]
    async fn insert_default_roles(&self, server_id: i64) -> Result<(Role, Role), AppError> {
        let mut tx = self.pool.begin().await?;
        let everyone = Self::insert_in(&mut tx, &NewRole::everyone(server_id)).await?;
        let owner = Self::insert_in(&mut tx, &NewRole::owner(server_id)).await?;
        tx.commit().await?;
        Ok((everyone, owner))
    }

    #[instrument(skip(self))]
    async fn assign_role(
        &self,
        server_id: i64,
        user_id: i64,
        role_id: i64,
        assigned_by: i64,
    ) -> Result<(), AppError> {
        let member_id = self.member_id(server_id, user_id).await?;
        sqlx::query(
            r#"
            INSERT INTO server_member_roles (member_id, role_id, assigned_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (member_id, role_id) DO NOTHING
            "#,
        )
        .bind(member_id)
        .bind(role_id)
        .bind(assigned_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn unassign_role(
        &self,
        server_id: i64,
        user_id: i64,
        role_id: i64,
    ) -> Result<bool, AppError> {
        let member_id = self.member_id(server_id, user_id).await?;
        let result = sqlx::query(
            r#"
            DELETE FROM server_member_roles
            WHERE member_id = $1 AND role_id = $2
            "#,
        )
        .bind(member_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn set_personal_permissions(
        &self,
        server_id: i64,
        user_id: i64,
        permissions: Permissions,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE server_members
            SET personal_permissions = $3
            WHERE server_id = $1 AND user_id = $2
            "#,
        )
        .bind(server_id)
        .bind(user_id)
        .bind(permissions.to_storage())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Member not found in server {} for user {}",
                server_id, user_id
            )));
        }

        Ok(())
    }
}
