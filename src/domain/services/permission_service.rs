//! Permission decision facade.
//!
//! The single entry point every other subsystem asks "may this user do that
//! here?". It loads the member for the server owning the scope, gates on
//! membership, applies the administrator bypass, then hands the loaded data to
//! the pure resolvers.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, instrument, warn};

use super::resolver::{resolve_channel, resolve_folder, resolve_server, ScopeResolution};
use super::role_aggregator::ActiveRoles;
use crate::domain::entities::{Member, MemberRepository, OverrideRepository, Role, ScopeRepository};
use crate::domain::value_objects::{Permission, Permissions, Scope};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Decision API shared by the facade and its cached wrapper.
///
/// Implementors only provide [`try_effective_permissions`](Self::try_effective_permissions);
/// every other method derives from it and fails closed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Effective mask of a user at a scope.
    ///
    /// `NOTHING` for non-members and inactive members, `ALL` for
    /// administrators. Errors only on failed lookups or inconsistent data.
    async fn try_effective_permissions(&self, user_id: i64, scope: Scope)
        -> Result<Permissions, AppError>;

    /// Like [`try_effective_permissions`](Self::try_effective_permissions), but
    /// logs failures and answers `NOTHING` instead.
    async fn effective_permissions(&self, user_id: i64, scope: Scope) -> Permissions {
        match self.try_effective_permissions(user_id, scope).await {
            Ok(permissions) => permissions,
            Err(e) if e.is_integrity() => {
                error!(user_id, %scope, error = %e, "Inconsistent permission data, denying");
                Permissions::NOTHING
            }
            Err(e) => {
                warn!(user_id, %scope, error = %e, "Permission lookup failed, denying");
                Permissions::NOTHING
            }
        }
    }

    async fn has_permission(&self, user_id: i64, scope: Scope, permission: Permission) -> bool {
        let started = Instant::now();
        let granted = self.effective_permissions(user_id, scope).await.has(permission);
        metrics::record_permission_check(scope.kind(), granted, started.elapsed().as_secs_f64());
        debug!(user_id, %scope, %permission, granted, "Permission check");
        granted
    }

    /// `Err(Forbidden)` naming the missing permission when the check fails.
    async fn require_permission(
        &self,
        user_id: i64,
        scope: Scope,
        permission: Permission,
    ) -> Result<(), AppError> {
        if self.has_permission(user_id, scope, permission).await {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("missing {permission} on {scope}")))
        }
    }

    async fn can_view(&self, user_id: i64, scope: Scope) -> bool {
        self.has_permission(user_id, scope, Permission::ViewChannel).await
    }

    async fn can_send_messages(&self, user_id: i64, channel_id: i64) -> bool {
        self.has_permission(user_id, Scope::Channel(channel_id), Permission::SendMessages)
            .await
    }

    async fn can_manage_channels(&self, user_id: i64, scope: Scope) -> bool {
        self.has_permission(user_id, scope, Permission::ManageChannels).await
    }

    async fn can_manage_permissions(&self, user_id: i64, scope: Scope) -> bool {
        self.has_permission(user_id, scope, Permission::ManagePermissions).await
    }

    async fn can_manage_roles(&self, user_id: i64, server_id: i64) -> bool {
        self.has_permission(user_id, Scope::Server(server_id), Permission::ManageRoles)
            .await
    }

    async fn can_ban_members(&self, user_id: i64, server_id: i64) -> bool {
        self.has_permission(user_id, Scope::Server(server_id), Permission::BanMembers)
            .await
    }

    async fn can_kick_members(&self, user_id: i64, server_id: i64) -> bool {
        self.has_permission(user_id, Scope::Server(server_id), Permission::KickMembers)
            .await
    }

    async fn can_create_invites(&self, user_id: i64, server_id: i64) -> bool {
        self.has_permission(user_id, Scope::Server(server_id), Permission::CreateInvite)
            .await
    }

    async fn can_manage_server(&self, user_id: i64, server_id: i64) -> bool {
        self.has_permission(user_id, Scope::Server(server_id), Permission::ManageServer)
            .await
    }
}

/// Permission facade over the membership, override and scope read stores.
pub struct PermissionService<M, O, S>
where
    M: MemberRepository,
    O: OverrideRepository,
    S: ScopeRepository,
{
    members: Arc<M>,
    overrides: Arc<O>,
    scopes: Arc<S>,
}

impl<M, O, S> Clone for PermissionService<M, O, S>
where
    M: MemberRepository,
    O: OverrideRepository,
    S: ScopeRepository,
{
    fn clone(&self) -> Self {
        Self {
            members: Arc::clone(&self.members),
            overrides: Arc::clone(&self.overrides),
            scopes: Arc::clone(&self.scopes),
        }
    }
}

impl<M, O, S> PermissionService<M, O, S>
where
    M: MemberRepository,
    O: OverrideRepository,
    S: ScopeRepository,
{
    pub fn new(members: Arc<M>, overrides: Arc<O>, scopes: Arc<S>) -> Self {
        Self {
            members,
            overrides,
            scopes,
        }
    }

    /// Whether the user is an active member of the server. Fails closed.
    pub async fn is_server_member(&self, user_id: i64, server_id: i64) -> bool {
        match self.load_member(user_id, Scope::Server(server_id)).await {
            Ok(member) => member.is_some(),
            Err(e) => {
                warn!(user_id, server_id, error = %e, "Membership lookup failed");
                false
            }
        }
    }

    /// Server-wide grant of a member.
    ///
    /// Administrators get `ADMINISTRATOR` alone, everyone else the union of
    /// active role grants and personal grants. Non-members get `NOTHING`.
    pub async fn server_permissions(&self, user_id: i64, server_id: i64) -> Permissions {
        let member = match self.load_member(user_id, Scope::Server(server_id)).await {
            Ok(Some(member)) => member,
            Ok(None) => return Permissions::NOTHING,
            Err(e) => {
                warn!(user_id, server_id, error = %e, "Membership lookup failed");
                return Permissions::NOTHING;
            }
        };
        let roles = ActiveRoles::of(&member);
        if roles.is_admin() {
            return Permission::Administrator.into();
        }
        resolve_server(&roles, member.personal_permissions)
    }

    /// Active roles of a member, highest position first. Empty for non-members.
    pub async fn member_roles(&self, user_id: i64, server_id: i64) -> Vec<Role> {
        match self.load_member(user_id, Scope::Server(server_id)).await {
            Ok(Some(member)) => ActiveRoles::of(&member).sorted_by_position(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(user_id, server_id, error = %e, "Membership lookup failed");
                Vec::new()
            }
        }
    }

    /// Active membership in the server owning `scope`.
    async fn load_member(&self, user_id: i64, scope: Scope) -> Result<Option<Member>, AppError> {
        let member = match scope {
            Scope::Server(id) => self.members.find_active(user_id, id).await?,
            Scope::Folder(id) => self.members.find_active_by_folder(user_id, id).await?,
            Scope::Channel(id) => self.members.find_active_by_channel(user_id, id).await?,
        };
        Ok(member.filter(|m| m.is_active))
    }

    async fn folder_resolution(
        &self,
        member: &Member,
        roles: &ActiveRoles<'_>,
        folder_id: i64,
    ) -> Result<ScopeResolution, AppError> {
        let role_ids = roles.ids();
        let (role_overrides, user_override) = futures::try_join!(
            self.overrides.folder_overrides_for_roles(folder_id, &role_ids),
            self.overrides.folder_override_for_user(folder_id, member.user_id),
        )?;

        Ok(resolve_folder(
            roles,
            member.user_id,
            member.personal_permissions,
            &role_overrides,
            user_override.as_ref(),
        ))
    }

    async fn channel_resolution(
        &self,
        member: &Member,
        roles: &ActiveRoles<'_>,
        channel_id: i64,
    ) -> Result<ScopeResolution, AppError> {
        let folder_id = self
            .scopes
            .channel_folder_id(channel_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("channel {channel_id}")))?;

        let role_ids = roles.ids();
        let (folder, role_overrides, user_override) = futures::try_join!(
            self.folder_resolution(member, roles, folder_id),
            self.overrides.channel_overrides_for_roles(channel_id, &role_ids),
            self.overrides.channel_override_for_user(channel_id, member.user_id),
        )?;

        Ok(resolve_channel(
            &folder,
            roles,
            member.user_id,
            member.personal_permissions,
            &role_overrides,
            user_override.as_ref(),
        ))
    }
}

#[async_trait]
impl<M, O, S> PermissionChecker for PermissionService<M, O, S>
where
    M: MemberRepository,
    O: OverrideRepository,
    S: ScopeRepository,
{
    #[instrument(skip(self, scope), fields(scope = %scope))]
    async fn try_effective_permissions(
        &self,
        user_id: i64,
        scope: Scope,
    ) -> Result<Permissions, AppError> {
        let Some(member) = self.load_member(user_id, scope).await? else {
            debug!("Not an active member");
            return Ok(Permissions::NOTHING);
        };

        let roles = ActiveRoles::of(&member);
        if roles.is_admin() {
            return Ok(Permissions::ALL);
        }

        let effective = match scope {
            Scope::Server(_) => resolve_server(&roles, member.personal_permissions),
            Scope::Folder(id) => self.folder_resolution(&member, &roles, id).await?.effective(),
            Scope::Channel(id) => self.channel_resolution(&member, &roles, id).await?.effective(),
        };
        Ok(effective)
    }
}
