//! Folder and channel entities and the scope hierarchy repository.
//!
//! Maps to the `channel_folders` and `channels` tables in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Scope;
use crate::shared::error::AppError;

/// Channel types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    #[default]
    Text,
    Voice,
}

/// A folder groups channels inside a server.
///
/// Maps to the `channel_folders` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - server_id: BIGINT NOT NULL REFERENCES servers(id) ON DELETE CASCADE
/// - name: VARCHAR(100) NOT NULL
/// - position: INTEGER NOT NULL DEFAULT 0
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    pub server_id: i64,
    pub name: String,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A channel always lives in exactly one folder.
///
/// Maps to the `channels` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - folder_id: BIGINT NOT NULL REFERENCES channel_folders(id) ON DELETE CASCADE
/// - name: VARCHAR(100) NOT NULL
/// - type: VARCHAR(16) NOT NULL DEFAULT 'text'
/// - position: INTEGER NOT NULL DEFAULT 0
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub folder_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Hierarchy lookups: which folder a channel sits in, which server owns a scope.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScopeRepository: Send + Sync {
    /// Parent folder of a channel, `None` if the channel does not exist.
    async fn channel_folder_id(&self, channel_id: i64) -> Result<Option<i64>, AppError>;

    /// Server owning a scope, `None` if the scope does not exist.
    async fn server_id_of(&self, scope: Scope) -> Result<Option<i64>, AppError>;
}
