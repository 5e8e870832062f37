//! Cached checker wired to the write services.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_permissions::application::services::{
    CachedPermissionService, OverrideService, OverrideServiceImpl, RoleService, RoleServiceImpl,
    SetOverrideDto,
};
use chat_permissions::domain::services::{PermissionCache, PermissionChecker};
use chat_permissions::domain::{Permission, Permissions, RoleStore, Scope};
use chat_permissions::infrastructure::cache::InMemoryPermissionCache;
use chat_permissions::infrastructure::memory::InMemoryStore;
use chat_permissions::shared::error::AppError;

use crate::common::{Facade, TestWorld};

/// Resolves through the facade, then kicks the member and invalidates the
/// cache before handing back the now outdated mask.
struct KickedDuringResolution {
    facade: Arc<Facade>,
    store: Arc<InMemoryStore>,
    cache: Arc<InMemoryPermissionCache>,
    server_id: i64,
    kicked: AtomicBool,
}

#[async_trait]
impl PermissionChecker for KickedDuringResolution {
    async fn try_effective_permissions(
        &self,
        user_id: i64,
        scope: Scope,
    ) -> Result<Permissions, AppError> {
        let permissions = self.facade.try_effective_permissions(user_id, scope).await?;
        if !self.kicked.swap(true, Ordering::SeqCst) {
            self.store.deactivate_member(self.server_id, user_id)?;
            self.cache.invalidate_all().await?;
        }
        Ok(permissions)
    }
}

#[tokio::test]
async fn test_direct_store_writes_are_stale_until_invalidated() {
    let world = TestWorld::new().await;
    let cached = world.cached();
    let user = world.join();

    assert!(!cached.can_kick_members(user, world.server_id).await);

    // bypasses the services, so nothing invalidates
    world.set_personal(user, Permission::KickMembers).await;
    assert!(!cached.can_kick_members(user, world.server_id).await);
    assert!(world.permissions.can_kick_members(user, world.server_id).await);

    cached.cache().invalidate_all().await.unwrap();
    assert!(cached.can_kick_members(user, world.server_id).await);
}

#[tokio::test]
async fn test_role_service_writes_invalidate() {
    let world = TestWorld::new().await;
    let cached = world.cached();
    let cache: Arc<dyn PermissionCache> = cached.cache();
    let service = RoleServiceImpl::new(Arc::clone(&world.store), Arc::clone(&cached) as Arc<dyn PermissionChecker>)
        .with_cache(cache);
    let user = world.join();
    let role = world.create_role(Permission::BanMembers).await;

    assert!(!cached.can_ban_members(user, world.server_id).await);
    service
        .assign_role(world.server_id, user, role, world.owner_id)
        .await
        .unwrap();
    assert!(cached.can_ban_members(user, world.server_id).await);

    service.deactivate_role(role, world.owner_id).await.unwrap();
    assert!(!cached.can_ban_members(user, world.server_id).await);
}

#[tokio::test]
async fn test_override_service_writes_invalidate() {
    let world = TestWorld::new().await;
    let cached = world.cached();
    let cache: Arc<dyn PermissionCache> = cached.cache();
    let service = OverrideServiceImpl::new(
        Arc::clone(&world.store),
        Arc::clone(&world.store),
        Arc::clone(&world.store),
        Arc::clone(&cached) as Arc<dyn PermissionChecker>,
    )
    .with_cache(cache);
    let user = world.join();

    assert!(cached.can_view(user, world.channel()).await);
    service
        .set_override(
            world.channel(),
            world.owner_id,
            SetOverrideDto {
                user_id: Some(user),
                denied: Permission::ViewChannel.into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!cached.can_view(user, world.channel()).await);

    service
        .clear_override(world.channel(), world.owner_id, None, Some(user))
        .await
        .unwrap();
    assert!(cached.can_view(user, world.channel()).await);
}

#[tokio::test]
async fn test_cached_answers_match_facade() {
    let world = TestWorld::new().await;
    let cached = world.cached();
    let user = world.join();
    let role = world.create_role(Permission::Connect | Permission::Speak).await;
    world.grant(user, role).await;
    world
        .role_override(world.folder(), role, Permissions::NOTHING, Permission::Speak)
        .await;

    let mut everyone = world
        .store
        .find_role(world.everyone_role_id)
        .await
        .unwrap()
        .unwrap();
    everyone.permissions = everyone.permissions.with(Permission::EmbedLinks);
    world.store.update_role(&everyone).await.unwrap();

    for scope in [world.server(), world.folder(), world.channel()] {
        // twice: once resolved, once from the cache
        for _ in 0..2 {
            assert_eq!(
                cached.effective_permissions(user, scope).await,
                world.permissions.effective_permissions(user, scope).await,
            );
        }
    }
}

#[tokio::test]
async fn test_kick_during_resolution_is_not_hidden_by_cache() {
    let world = TestWorld::new().await;
    let user = world.join();
    let cache = Arc::new(InMemoryPermissionCache::new(Duration::from_secs(600)));
    let inner = KickedDuringResolution {
        facade: Arc::clone(&world.permissions),
        store: Arc::clone(&world.store),
        cache: Arc::clone(&cache),
        server_id: world.server_id,
        kicked: AtomicBool::new(false),
    };
    let cached = CachedPermissionService::new(Arc::new(inner), Arc::clone(&cache));

    // the in-flight check still answers from the data it read
    assert!(cached.can_view(user, world.channel()).await);
    assert!(!cached.can_view(user, world.channel()).await);
    assert_eq!(
        cached.effective_permissions(user, world.channel()).await,
        Permissions::NOTHING
    );
}
