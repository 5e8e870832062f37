//! Common Test Utilities
//!
//! A populated in-memory server plus helpers to shape its roles, members
//! and overrides.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chat_permissions::application::services::{
    CachedPermissionService, OverrideServiceImpl, RoleServiceImpl,
};
use chat_permissions::domain::services::{PermissionChecker, PermissionService};
use chat_permissions::domain::{
    NewPermissionOverride, NewRole, OverrideScope, OverrideStore, OverrideTarget, Permission,
    Permissions, RoleStore, Scope,
};
use chat_permissions::infrastructure::cache::InMemoryPermissionCache;
use chat_permissions::infrastructure::memory::InMemoryStore;
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Word;
use fake::Fake;

pub type Facade = PermissionService<InMemoryStore, InMemoryStore, InMemoryStore>;
pub type CachedFacade = CachedPermissionService<Facade, InMemoryPermissionCache>;

/// A random user id well outside the store's own id range.
pub fn random_user_id() -> i64 {
    (1_000_000..i64::MAX).fake::<i64>()
}

/// One server with its default roles, an owner, one folder and one channel in it.
pub struct TestWorld {
    pub store: Arc<InMemoryStore>,
    pub permissions: Arc<Facade>,
    pub server_id: i64,
    pub everyone_role_id: i64,
    pub owner_role_id: i64,
    pub owner_id: i64,
    pub folder_id: i64,
    pub channel_id: i64,
}

impl TestWorld {
    pub async fn new() -> Self {
        chat_permissions::telemetry::init_test_tracing();

        let store = Arc::new(InMemoryStore::new());
        let owner_id = random_user_id();
        let server_id = store.add_server(&CompanyName().fake::<String>(), owner_id);
        let (everyone, owner) = store.insert_default_roles(server_id).await.unwrap();

        store.add_member(server_id, owner_id).unwrap();
        store
            .assign_role(server_id, owner_id, owner.id, owner_id)
            .await
            .unwrap();

        let folder_id = store.add_folder(server_id, "general").unwrap();
        let channel_id = store.add_channel(folder_id, &Word().fake::<String>()).unwrap();

        let permissions = Arc::new(PermissionService::new(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
        ));

        Self {
            store,
            permissions,
            server_id,
            everyone_role_id: everyone.id,
            owner_role_id: owner.id,
            owner_id,
            folder_id,
            channel_id,
        }
    }

    pub fn folder(&self) -> Scope {
        Scope::Folder(self.folder_id)
    }

    pub fn channel(&self) -> Scope {
        Scope::Channel(self.channel_id)
    }

    pub fn server(&self) -> Scope {
        Scope::Server(self.server_id)
    }

    /// A fresh user joined to the server, holding only the everyone role.
    pub fn join(&self) -> i64 {
        let user_id = random_user_id();
        self.store.add_member(self.server_id, user_id).unwrap();
        user_id
    }

    /// Replace the server grant of the everyone role.
    pub async fn set_everyone(&self, permissions: Permissions) {
        let mut everyone = self
            .store
            .find_role(self.everyone_role_id)
            .await
            .unwrap()
            .unwrap();
        everyone.permissions = permissions;
        self.store.update_role(&everyone).await.unwrap();
    }

    pub async fn create_role(&self, permissions: impl Into<Permissions>) -> i64 {
        self.store
            .insert_role(&NewRole {
                server_id: self.server_id,
                name: Word().fake(),
                color: None,
                position: (1..100).fake(),
                permissions: permissions.into(),
                mentionable: true,
                is_everyone: false,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn grant(&self, user_id: i64, role_id: i64) {
        self.store
            .assign_role(self.server_id, user_id, role_id, self.owner_id)
            .await
            .unwrap();
    }

    pub async fn set_personal(&self, user_id: i64, permissions: impl Into<Permissions>) {
        self.store
            .set_personal_permissions(self.server_id, user_id, permissions.into())
            .await
            .unwrap();
    }

    pub async fn role_override(
        &self,
        scope: Scope,
        role_id: i64,
        allowed: impl Into<Permissions>,
        denied: impl Into<Permissions>,
    ) {
        self.save_override(scope, OverrideTarget::Role(role_id), allowed.into(), denied.into())
            .await;
    }

    pub async fn user_override(
        &self,
        scope: Scope,
        user_id: i64,
        allowed: impl Into<Permissions>,
        denied: impl Into<Permissions>,
    ) {
        self.save_override(scope, OverrideTarget::User(user_id), allowed.into(), denied.into())
            .await;
    }

    async fn save_override(
        &self,
        scope: Scope,
        target: OverrideTarget,
        allowed: Permissions,
        denied: Permissions,
    ) {
        self.store
            .save_override(&NewPermissionOverride {
                scope: OverrideScope::try_from(scope).unwrap(),
                target,
                allowed,
                denied,
            })
            .await
            .unwrap();
    }

    pub async fn has(&self, user_id: i64, scope: Scope, permission: Permission) -> bool {
        self.permissions.has_permission(user_id, scope, permission).await
    }

    pub fn checker(&self) -> Arc<dyn PermissionChecker> {
        Arc::clone(&self.permissions) as Arc<dyn PermissionChecker>
    }

    pub fn role_service(&self) -> RoleServiceImpl<InMemoryStore> {
        RoleServiceImpl::new(Arc::clone(&self.store), self.checker())
    }

    pub fn override_service(&self) -> OverrideServiceImpl<InMemoryStore, InMemoryStore, InMemoryStore> {
        OverrideServiceImpl::new(
            Arc::clone(&self.store),
            Arc::clone(&self.store),
            Arc::clone(&self.store),
            self.checker(),
        )
    }

    /// Facade wrapped in an in-process cache with a long TTL.
    pub fn cached(&self) -> Arc<CachedFacade> {
        Arc::new(CachedPermissionService::new(
            Arc::clone(&self.permissions),
            Arc::new(InMemoryPermissionCache::new(Duration::from_secs(600))),
        ))
    }
}
