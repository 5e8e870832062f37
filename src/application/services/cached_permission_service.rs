//! Cache-aside wrapper around a [`PermissionChecker`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::services::{CacheRead, PermissionCache, PermissionChecker};
use crate::domain::value_objects::{Permissions, Scope};
use crate::infrastructure::metrics::{self, CacheLookup};
use crate::shared::error::AppError;

/// Serves effective masks from a [`PermissionCache`] and falls back to the
/// wrapped checker on a miss.
///
/// A failing cache never fails a check: read errors count as misses and
/// write errors are only logged. Failed resolutions are never stored, and a
/// mask is stored only under the generation its lookup saw.
pub struct CachedPermissionService<P, C>
where
    P: PermissionChecker,
    C: PermissionCache,
{
    inner: Arc<P>,
    cache: Arc<C>,
}

impl<P, C> Clone for CachedPermissionService<P, C>
where
    P: PermissionChecker,
    C: PermissionCache,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<P, C> CachedPermissionService<P, C>
where
    P: PermissionChecker,
    C: PermissionCache,
{
    pub fn new(inner: Arc<P>, cache: Arc<C>) -> Self {
        Self { inner, cache }
    }

    /// The cache, for handing to the write services that invalidate it.
    pub fn cache(&self) -> Arc<C> {
        Arc::clone(&self.cache)
    }
}

#[async_trait]
impl<P, C> PermissionChecker for CachedPermissionService<P, C>
where
    P: PermissionChecker + 'static,
    C: PermissionCache + 'static,
{
    async fn try_effective_permissions(
        &self,
        user_id: i64,
        scope: Scope,
    ) -> Result<Permissions, AppError> {
        let generation = match self.cache.get(user_id, scope).await {
            Ok(CacheRead {
                permissions: Some(permissions),
                ..
            }) => {
                metrics::record_cache_lookup(CacheLookup::Hit);
                return Ok(permissions);
            }
            Ok(read) => {
                metrics::record_cache_lookup(CacheLookup::Miss);
                Some(read.generation)
            }
            Err(e) => {
                metrics::record_cache_lookup(CacheLookup::Error);
                warn!(user_id, %scope, error = %e, "Permission cache read failed");
                None
            }
        };

        let permissions = self.inner.try_effective_permissions(user_id, scope).await?;

        // without a generation the write could outlive an invalidation
        let Some(generation) = generation else {
            return Ok(permissions);
        };
        if let Err(e) = self.cache.put(user_id, scope, generation, permissions).await {
            warn!(user_id, %scope, error = %e, "Permission cache write failed");
        } else {
            debug!(user_id, %scope, generation, "Permission mask cached");
        }
        Ok(permissions)
    }
}
