//! Override Repository Implementation
//!
//! PostgreSQL implementation of the OverrideRepository and OverrideStore traits
//! over `folder_permission_overrides` and `channel_permission_overrides`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{error, instrument};

use crate::domain::{
    NewPermissionOverride, OverrideRepository, OverrideScope, OverrideStore, OverrideTarget,
    PermissionOverride, Permissions,
};
use crate::shared::error::AppError;

/// Table layout of one override family.
#[derive(Debug, Clone, Copy)]
struct OverrideTable {
    table: &'static str,
    scope_column: &'static str,
    scope: fn(i64) -> OverrideScope,
}

const FOLDER_OVERRIDES: OverrideTable = OverrideTable {
    table: "folder_permission_overrides",
    scope_column: "folder_id",
    scope: OverrideScope::Folder,
};

const CHANNEL_OVERRIDES: OverrideTable = OverrideTable {
    table: "channel_permission_overrides",
    scope_column: "channel_id",
    scope: OverrideScope::Channel,
};

impl OverrideTable {
    const fn of(scope: OverrideScope) -> Self {
        match scope {
            OverrideScope::Folder(_) => FOLDER_OVERRIDES,
            OverrideScope::Channel(_) => CHANNEL_OVERRIDES,
        }
    }

    fn select(&self, filter: &str) -> String {
        format!(
            "SELECT id, {scope} AS scope_id, role_id, user_id, allowed, denied, created_at \
             FROM {table} WHERE {scope} = $1 AND {filter}",
            scope = self.scope_column,
            table = self.table,
        )
    }
}

/// Database row representation shared by both override tables.
#[derive(Debug, sqlx::FromRow)]
struct OverrideRow {
    id: i64,
    scope_id: i64,
    role_id: Option<i64>,
    user_id: Option<i64>,
    allowed: i64,
    denied: i64,
    created_at: DateTime<Utc>,
}

impl OverrideRow {
    /// Convert database row to a domain override.
    ///
    /// A row naming both or neither target is reported as an integrity error;
    /// the schema's CHECK constraint should make this unreachable.
    fn into_override(self, table: OverrideTable) -> Result<PermissionOverride, AppError> {
        let target = OverrideTarget::from_columns(self.role_id, self.user_id).map_err(|e| {
            error!(table = table.table, override_id = self.id, error = %e, "Malformed override row");
            AppError::Integrity(format!("{} row {}: {}", table.table, self.id, e))
        })?;
        Ok(PermissionOverride {
            id: self.id,
            scope: (table.scope)(self.scope_id),
            target,
            allowed: Permissions::from_storage(self.allowed),
            denied: Permissions::from_storage(self.denied),
            created_at: self.created_at,
        })
    }
}

fn into_overrides(
    rows: Vec<OverrideRow>,
    table: OverrideTable,
) -> Result<Vec<PermissionOverride>, AppError> {
    rows.into_iter().map(|r| r.into_override(table)).collect()
}

/// PostgreSQL override repository implementation.
#[derive(Clone)]
pub struct PgOverrideRepository {
    pool: PgPool,
}

impl PgOverrideRepository {
    /// Create a new PgOverrideRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn for_roles(
        &self,
        scope: OverrideScope,
        role_ids: &[i64],
    ) -> Result<Vec<PermissionOverride>, AppError> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let table = OverrideTable::of(scope);
        let rows = sqlx::query_as::<_, OverrideRow>(&table.select("role_id = ANY($2)"))
            .bind(scope.id())
            .bind(role_ids)
            .fetch_all(&self.pool)
            .await?;

        into_overrides(rows, table)
    }

    async fn for_user(
        &self,
        scope: OverrideScope,
        user_id: i64,
    ) -> Result<Option<PermissionOverride>, AppError> {
        let table = OverrideTable::of(scope);
        let row = sqlx::query_as::<_, OverrideRow>(&table.select("user_id = $2"))
            .bind(scope.id())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_override(table)).transpose()
    }
}

#[async_trait]
impl OverrideRepository for PgOverrideRepository {
    async fn folder_overrides_for_roles(
        &self,
        folder_id: i64,
        role_ids: &[i64],
    ) -> Result<Vec<PermissionOverride>, AppError> {
        self.for_roles(OverrideScope::Folder(folder_id), role_ids).await
    }

    async fn folder_override_for_user(
        &self,
        folder_id: i64,
        user_id: i64,
    ) -> Result<Option<PermissionOverride>, AppError> {
        self.for_user(OverrideScope::Folder(folder_id), user_id).await
    }

    async fn channel_overrides_for_roles(
        &self,
        channel_id: i64,
        role_ids: &[i64],
    ) -> Result<Vec<PermissionOverride>, AppError> {
        self.for_roles(OverrideScope::Channel(channel_id), role_ids).await
    }

    async fn channel_override_for_user(
        &self,
        channel_id: i64,
        user_id: i64,
    ) -> Result<Option<PermissionOverride>, AppError> {
        self.for_user(OverrideScope::Channel(channel_id), user_id).await
    }
}

#[async_trait]
impl OverrideStore for PgOverrideRepository {
    #[instrument(skip(self, payload), fields(scope = ?payload.scope, target = ?payload.target))]
    async fn save_override(
        &self,
        payload: &NewPermissionOverride,
    ) -> Result<PermissionOverride, AppError> {
        let table = OverrideTable::of(payload.scope);
        let (role_id, user_id) = payload.target.to_columns();
        let conflict_column = match payload.target {
            OverrideTarget::Role(_) => "role_id",
            OverrideTarget::User(_) => "user_id",
        };
        let sql = format!(
            r#"
            INSERT INTO {table} ({scope}, role_id, user_id, allowed, denied)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ({scope}, {conflict_column}) WHERE {conflict_column} IS NOT NULL
            DO UPDATE SET allowed = EXCLUDED.allowed, denied = EXCLUDED.denied
            RETURNING id, {scope} AS scope_id, role_id, user_id, allowed, denied, created_at
            "#,
            table = table.table,
            scope = table.scope_column,
        );

        let row = sqlx::query_as::<_, OverrideRow>(&sql)
            .bind(payload.scope.id())
            .bind(role_id)
            .bind(user_id)
            .bind(payload.allowed.to_storage())
            .bind(payload.denied.to_storage())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::NotFound("Scope or role not found".to_string())
                }
                sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                    AppError::Validation("Override must target exactly one role or user".to_string())
                }
                _ => AppError::Database(e),
            })?;

        row.into_override(table)
    }

    #[instrument(skip(self))]
    async fn delete_override(
        &self,
        scope: OverrideScope,
        target: OverrideTarget,
    ) -> Result<bool, AppError> {
        let table = OverrideTable::of(scope);
        let target_column = match target {
            OverrideTarget::Role(_) => "role_id",
            OverrideTarget::User(_) => "user_id",
        };
        let target_id = match target {
            OverrideTarget::Role(id) | OverrideTarget::User(id) => id,
        };
        let sql = format!(
            "DELETE FROM {table} WHERE {scope} = $1 AND {target_column} = $2",
            table = table.table,
            scope = table.scope_column,
        );

        let result = sqlx::query(&sql)
            .bind(scope.id())
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_overrides(
        &self,
        scope: OverrideScope,
    ) -> Result<Vec<PermissionOverride>, AppError> {
        let table = OverrideTable::of(scope);
        let sql = format!("{} ORDER BY (role_id IS NULL), id", table.select("TRUE"));
        let rows = sqlx::query_as::<_, OverrideRow>(&sql)
            .bind(scope.id())
            .fetch_all(&self.pool)
            .await?;

        into_overrides(rows, table)
    }
}
