//! Cache contract for resolved effective masks.

use async_trait::async_trait;

use crate::domain::value_objects::{Permissions, Scope};
use crate::shared::error::AppError;

/// Result of a cache lookup.
///
/// `generation` identifies the cache contents the lookup saw. A mask resolved
/// after a miss is written back under that generation, so a write that lands
/// after an invalidation stays invisible to later lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheRead {
    pub permissions: Option<Permissions>,
    pub generation: u64,
}

impl CacheRead {
    pub fn hit(permissions: Permissions, generation: u64) -> Self {
        Self {
            permissions: Some(permissions),
            generation,
        }
    }

    pub fn miss(generation: u64) -> Self {
        Self {
            permissions: None,
            generation,
        }
    }
}

/// Stores effective masks keyed by `(user, scope)`.
///
/// Entries are only ever dropped wholesale: any role, override or membership
/// write can change masks across a whole server, so writers call
/// [`invalidate_all`](Self::invalidate_all) instead of tracking affected keys.
/// Invalidation starts a new generation; `put` must pass the generation of the
/// [`get`](Self::get) that preceded resolution.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionCache: Send + Sync {
    async fn get(&self, user_id: i64, scope: Scope) -> Result<CacheRead, AppError>;

    async fn put(
        &self,
        user_id: i64,
        scope: Scope,
        generation: u64,
        permissions: Permissions,
    ) -> Result<(), AppError>;

    async fn invalidate_all(&self) -> Result<(), AppError>;
}
