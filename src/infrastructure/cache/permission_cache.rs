//! Permission Cache Implementations
//!
//! Redis-backed and in-process caches for resolved effective masks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, instrument};

use super::keys;
use crate::domain::services::{CacheRead, PermissionCache};
use crate::domain::value_objects::{Permissions, Scope};
use crate::shared::error::AppError;

/// Redis permission cache.
///
/// Keys embed a global generation counter; bumping the counter orphans every
/// existing entry at once and the TTL reclaims them.
#[derive(Clone)]
pub struct RedisPermissionCache {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl RedisPermissionCache {
    /// Create a new permission cache with the given entry lifetime.
    pub fn new(redis: ConnectionManager, ttl: Duration) -> Self {
        Self {
            redis,
            ttl_secs: ttl.as_secs().max(1),
        }
    }

    async fn generation(&self) -> Result<u64, AppError> {
        let mut conn = self.redis.clone();
        let generation: Option<u64> = conn.get(keys::PERMISSIONS_GENERATION).await?;
        Ok(generation.unwrap_or(0))
    }
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn get(&self, user_id: i64, scope: Scope) -> Result<CacheRead, AppError> {
        let generation = self.generation().await?;
        let key = keys::permissions(generation, user_id, scope);

        let mut conn = self.redis.clone();
        let bits: Option<u64> = conn.get(&key).await?;
        Ok(match bits {
            Some(bits) => CacheRead::hit(Permissions::from_bits_truncate(bits), generation),
            None => CacheRead::miss(generation),
        })
    }

    /// A retired generation writes an orphaned key that no lookup reaches;
    /// the TTL reclaims it.
    async fn put(
        &self,
        user_id: i64,
        scope: Scope,
        generation: u64,
        permissions: Permissions,
    ) -> Result<(), AppError> {
        let key = keys::permissions(generation, user_id, scope);

        let mut conn = self.redis.clone();
        let _: () = conn.set_ex(&key, permissions.bits(), self.ttl_secs).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_all(&self) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let generation: u64 = conn.incr(keys::PERMISSIONS_GENERATION, 1).await?;
        debug!(generation, "Permission cache generation bumped");
        Ok(())
    }
}

/// Entry count at which `put` sweeps expired and retired entries.
pub const SWEEP_THRESHOLD: usize = 4096;

/// In-process permission cache for single-node deployments and tests.
#[derive(Debug)]
pub struct InMemoryPermissionCache {
    entries: DashMap<(u64, i64, Scope), (Permissions, Instant)>,
    generation: AtomicU64,
    ttl: Duration,
}

impl InMemoryPermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn sweep(&self, generation: u64) {
        let before = self.entries.len();
        self.entries
            .retain(|(g, _, _), (_, stored_at)| *g == generation && stored_at.elapsed() < self.ttl);
        debug!(
            removed = before.saturating_sub(self.entries.len()),
            "Swept permission cache"
        );
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn get(&self, user_id: i64, scope: Scope) -> Result<CacheRead, AppError> {
        let generation = self.current_generation();
        let key = (generation, user_id, scope);
        let fresh = self
            .entries
            .get(&key)
            .map(|entry| (entry.0, entry.1.elapsed() < self.ttl));
        match fresh {
            Some((permissions, true)) => Ok(CacheRead::hit(permissions, generation)),
            Some((_, false)) => {
                self.entries.remove(&key);
                Ok(CacheRead::miss(generation))
            }
            None => Ok(CacheRead::miss(generation)),
        }
    }

    async fn put(
        &self,
        user_id: i64,
        scope: Scope,
        generation: u64,
        permissions: Permissions,
    ) -> Result<(), AppError> {
        let current = self.current_generation();
        if generation != current {
            debug!(user_id, %scope, generation, current, "Dropped mask resolved before invalidation");
            return Ok(());
        }
        if self.entries.len() >= SWEEP_THRESHOLD {
            self.sweep(current);
        }
        // an invalidation racing this insert leaves it under the retired generation
        self.entries
            .insert((generation, user_id, scope), (permissions, Instant::now()));
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<(), AppError> {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        Ok(())
    }
}
