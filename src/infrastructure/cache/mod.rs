//! Cache Module
//!
//! Redis connection management and the permission cache implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_permissions::infrastructure::cache::{create_redis_client, RedisPermissionCache};
//!
//! let conn = create_redis_client(&settings.redis).await?;
//! let cache = RedisPermissionCache::new(conn, settings.permissions.cache_ttl());
//! ```

mod permission_cache;

pub use permission_cache::{InMemoryPermissionCache, RedisPermissionCache, SWEEP_THRESHOLD};

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key layout.
pub mod keys {
    use crate::domain::value_objects::Scope;

    /// Counter embedded in every permission key; incrementing it drops all entries.
    pub const PERMISSIONS_GENERATION: &str = "perms:generation";

    /// Prefix for cached effective masks
    pub const PERMISSIONS: &str = "perms:";

    /// Generates a permission cache key, e.g. `perms:3:channel:42:7`
    #[inline]
    pub fn permissions(generation: u64, user_id: i64, scope: Scope) -> String {
        format!(
            "{}{}:{}:{}:{}",
            PERMISSIONS,
            generation,
            scope.kind(),
            scope.id(),
            user_id
        )
    }

}
