//! Scope Repository Implementation
//!
//! Resolves the server → folder → channel hierarchy.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Scope, ScopeRepository};
use crate::shared::error::AppError;

/// PostgreSQL scope repository implementation.
#[derive(Clone)]
pub struct PgScopeRepository {
    pool: PgPool,
}

impl PgScopeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScopeRepository for PgScopeRepository {
    async fn channel_folder_id(&self, channel_id: i64) -> Result<Option<i64>, AppError> {
        let folder_id = sqlx::query_scalar::<_, i64>("SELECT folder_id FROM channels WHERE id = $1")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(folder_id)
    }

    async fn server_id_of(&self, scope: Scope) -> Result<Option<i64>, AppError> {
        let query = match scope {
            Scope::Server(_) => "SELECT id FROM servers WHERE id = $1",
            Scope::Folder(_) => "SELECT server_id FROM channel_folders WHERE id = $1",
            Scope::Channel(_) => {
                r#"
                SELECT f.server_id
                FROM channels c
                INNER JOIN channel_folders f ON f.id = c.folder_id
                WHERE c.id = $1
                "#
            }
        };

        let server_id = sqlx::query_scalar::<_, i64>(query)
            .bind(scope.id())
            .fetch_optional(&self.pool)
            .await?;

        Ok(server_id)
    }
}
