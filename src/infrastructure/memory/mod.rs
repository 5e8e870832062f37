//! In-memory store.
//!
//! Arena tables keyed by id with explicit foreign keys, all behind one
//! `RwLock` so every read observes a consistent snapshot. Implements every
//! store trait of the domain layer and mirrors the relational schema's
//! cascades: deleting a server removes its roles, members, folders, channels
//! and overrides; deleting a folder removes its channels and overrides;
//! deleting a role removes its assignments and overrides.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Channel, ChannelType, Folder, Member, MemberRepository, NewPermissionOverride, NewRole,
    OverrideRepository, OverrideScope, OverrideStore, OverrideTarget, PermissionOverride,
    Permissions, Role, RoleStore, Scope, ScopeRepository,
};
use crate::shared::error::AppError;

/// A server row. Servers only anchor the hierarchy here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone)]
struct MemberRecord {
    member: Member,
    role_ids: BTreeSet<i64>,
}

/// Row counts, mostly useful to assert cascades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub servers: usize,
    pub roles: usize,
    pub members: usize,
    pub assignments: usize,
    pub folders: usize,
    pub channels: usize,
    pub overrides: usize,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    servers: BTreeMap<i64, ServerRecord>,
    roles: BTreeMap<i64, Role>,
    members: BTreeMap<i64, MemberRecord>,
    folders: BTreeMap<i64, Folder>,
    channels: BTreeMap<i64, Channel>,
    overrides: BTreeMap<i64, PermissionOverride>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn member_record(&self, server_id: i64, user_id: i64) -> Option<&MemberRecord> {
        self.members
            .values()
            .find(|r| r.member.server_id == server_id && r.member.user_id == user_id)
    }

    fn member_record_mut(&mut self, server_id: i64, user_id: i64) -> Option<&mut MemberRecord> {
        self.members
            .values_mut()
            .find(|r| r.member.server_id == server_id && r.member.user_id == user_id)
    }

    /// Assigned roles plus the implicit everyone role, position descending.
    fn hydrate(&self, record: &MemberRecord) -> Member {
        let mut roles: Vec<Role> = self
            .roles
            .values()
            .filter(|r| {
                r.server_id == record.member.server_id
                    && (r.is_everyone || record.role_ids.contains(&r.id))
            })
            .cloned()
            .collect();
        roles.sort_by(|a, b| b.position.cmp(&a.position).then(a.id.cmp(&b.id)));

        let mut member = record.member.clone();
        member.roles = roles;
        member
    }

    fn active_member(&self, user_id: i64, server_id: i64) -> Option<Member> {
        self.member_record(server_id, user_id)
            .filter(|r| r.member.is_active)
            .map(|r| self.hydrate(r))
    }

    fn server_of(&self, scope: Scope) -> Option<i64> {
        match scope {
            Scope::Server(id) => self.servers.contains_key(&id).then_some(id),
            Scope::Folder(id) => self.folders.get(&id).map(|f| f.server_id),
            Scope::Channel(id) => self
                .channels
                .get(&id)
                .and_then(|c| self.folders.get(&c.folder_id))
                .map(|f| f.server_id),
        }
    }

    fn overrides_where(&self, pred: impl Fn(&PermissionOverride) -> bool) -> Vec<PermissionOverride> {
        self.overrides.values().filter(|o| pred(*o)).cloned().collect()
    }

    fn remove_channel(&mut self, channel_id: i64) -> bool {
        let removed = self.channels.remove(&channel_id).is_some();
        self.overrides
            .retain(|_, o| o.scope != OverrideScope::Channel(channel_id));
        removed
    }

    fn remove_folder(&mut self, folder_id: i64) -> bool {
        let removed = self.folders.remove(&folder_id).is_some();
        let channel_ids: Vec<i64> = self
            .channels
            .values()
            .filter(|c| c.folder_id == folder_id)
            .map(|c| c.id)
            .collect();
        for channel_id in channel_ids {
            self.remove_channel(channel_id);
        }
        self.overrides
            .retain(|_, o| o.scope != OverrideScope::Folder(folder_id));
        removed
    }

    fn remove_role(&mut self, role_id: i64) -> bool {
        let removed = self.roles.remove(&role_id).is_some();
        for record in self.members.values_mut() {
            record.role_ids.remove(&role_id);
        }
        self.overrides
            .retain(|_, o| o.target != OverrideTarget::Role(role_id));
        removed
    }

    fn insert_role(&mut self, role: &NewRole) -> Result<Role, AppError> {
        if !self.servers.contains_key(&role.server_id) {
            return Err(AppError::NotFound("Server not found".to_string()));
        }
        if role.is_everyone
            && self
                .roles
                .values()
                .any(|r| r.server_id == role.server_id && r.is_everyone)
        {
            return Err(AppError::Conflict(
                "Server already has an everyone role".to_string(),
            ));
        }

        let role = Role {
            id: self.next_id(),
            server_id: role.server_id,
            name: role.name.clone(),
            color: role.color,
            position: role.position,
            permissions: role.permissions,
            mentionable: role.mentionable,
            is_everyone: role.is_everyone,
            is_active: true,
            created_at: Utc::now(),
        };
        self.roles.insert(role.id, role.clone());
        Ok(role)
    }
}

/// Thread-safe in-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bare server row. Its default roles are created separately
    /// through [`RoleStore::insert_default_roles`].
    pub fn add_server(&self, name: &str, owner_id: i64) -> i64 {
        let mut tables = self.tables.write();
        let id = tables.next_id();
        tables.servers.insert(
            id,
            ServerRecord {
                id,
                name: name.to_string(),
                owner_id,
            },
        );
        id
    }

    pub fn add_folder(&self, server_id: i64, name: &str) -> Result<i64, AppError> {
        let mut tables = self.tables.write();
        if !tables.servers.contains_key(&server_id) {
            return Err(AppError::NotFound(format!("Server {} not found", server_id)));
        }
        let id = tables.next_id();
        let position = tables
            .folders
            .values()
            .filter(|f| f.server_id == server_id)
            .count() as i32;
        tables.folders.insert(
            id,
            Folder {
                id,
                server_id,
                name: name.to_string(),
                position,
                is_active: true,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    pub fn add_channel(&self, folder_id: i64, name: &str) -> Result<i64, AppError> {
        let mut tables = self.tables.write();
        if !tables.folders.contains_key(&folder_id) {
            return Err(AppError::NotFound(format!("Folder {} not found", folder_id)));
        }
        let id = tables.next_id();
        let position = tables
            .channels
            .values()
            .filter(|c| c.folder_id == folder_id)
            .count() as i32;
        tables.channels.insert(
            id,
            Channel {
                id,
                folder_id,
                name: name.to_string(),
                channel_type: ChannelType::Text,
                position,
                is_active: true,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    /// Join a server. Rejoining reactivates the existing membership and
    /// keeps its role assignments.
    pub fn add_member(&self, server_id: i64, user_id: i64) -> Result<i64, AppError> {
        let mut tables = self.tables.write();
        if !tables.servers.contains_key(&server_id) {
            return Err(AppError::NotFound(format!("Server {} not found", server_id)));
        }
        if let Some(record) = tables.member_record_mut(server_id, user_id) {
            if record.member.is_active {
                return Err(AppError::Conflict(format!(
                    "User {} is already a member of server {}",
                    user_id, server_id
                )));
            }
            record.member.is_active = true;
            record.member.left_at = None;
            return Ok(record.member.id);
        }

        let id = tables.next_id();
        tables.members.insert(
            id,
            MemberRecord {
                member: Member::new(id, server_id, user_id),
                role_ids: BTreeSet::new(),
            },
        );
        Ok(id)
    }

    /// Leave, kick or ban: the member row stays but stops resolving.
    pub fn deactivate_member(&self, server_id: i64, user_id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.write();
        let record = tables.member_record_mut(server_id, user_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Member not found in server {} for user {}",
                server_id, user_id
            ))
        })?;
        record.member.is_active = false;
        record.member.left_at = Some(Utc::now());
        Ok(())
    }

    pub fn server(&self, server_id: i64) -> Option<ServerRecord> {
        self.tables.read().servers.get(&server_id).cloned()
    }

    /// Delete a server and everything it owns.
    pub fn delete_server(&self, server_id: i64) -> bool {
        let mut tables = self.tables.write();
        if tables.servers.remove(&server_id).is_none() {
            return false;
        }
        let folder_ids: Vec<i64> = tables
            .folders
            .values()
            .filter(|f| f.server_id == server_id)
            .map(|f| f.id)
            .collect();
        for folder_id in folder_ids {
            tables.remove_folder(folder_id);
        }
        let role_ids: Vec<i64> = tables
            .roles
            .values()
            .filter(|r| r.server_id == server_id)
            .map(|r| r.id)
            .collect();
        for role_id in role_ids {
            tables.remove_role(role_id);
        }
        tables.members.retain(|_, r| r.member.server_id != server_id);
        true
    }

    /// Delete a folder, its channels and every override attached to them.
    pub fn delete_folder(&self, folder_id: i64) -> bool {
        self.tables.write().remove_folder(folder_id)
    }

    /// Delete a channel and its overrides.
    pub fn delete_channel(&self, channel_id: i64) -> bool {
        self.tables.write().remove_channel(channel_id)
    }

    /// Hard-delete a role, dropping its assignments and overrides.
    pub fn delete_role(&self, role_id: i64) -> bool {
        self.tables.write().remove_role(role_id)
    }

    pub fn counts(&self) -> StoreCounts {
        let tables = self.tables.read();
        StoreCounts {
            servers: tables.servers.len(),
            roles: tables.roles.len(),
            members: tables.members.len(),
            assignments: tables.members.values().map(|r| r.role_ids.len()).sum(),
            folders: tables.folders.len(),
            channels: tables.channels.len(),
            overrides: tables.overrides.len(),
        }
    }
}

#[async_trait]
impl MemberRepository for InMemoryStore {
    async fn find_active(&self, user_id: i64, server_id: i64) -> Result<Option<Member>, AppError> {
        Ok(self.tables.read().active_member(user_id, server_id))
    }

    async fn find_active_by_folder(
        &self,
        user_id: i64,
        folder_id: i64,
    ) -> Result<Option<Member>, AppError> {
        let tables = self.tables.read();
        Ok(tables
            .server_of(Scope::Folder(folder_id))
            .and_then(|server_id| tables.active_member(user_id, server_id)))
    }

    async fn find_active_by_channel(
        &self,
        user_id: i64,
        channel_id: i64,
    ) -> Result<Option<Member>, AppError> {
        let tables = self.tables.read();
        Ok(tables
            .server_of(Scope::Channel(channel_id))
            .and_then(|server_id| tables.active_member(user_id, server_id)))
    }
}

#[async_trait]
impl ScopeRepository for InMemoryStore {
    async fn channel_folder_id(&self, channel_id: i64) -> Result<Option<i64>, AppError> {
        Ok(self.tables.read().channels.get(&channel_id).map(|c| c.folder_id))
    }

    async fn server_id_of(&self, scope: Scope) -> Result<Option<i64>, AppError> {
        Ok(self.tables.read().server_of(scope))
    }
}

#[async_trait]
impl OverrideRepository for InMemoryStore {
    async fn folder_overrides_for_roles(
        &self,
        folder_id: i64,
        role_ids: &[i64],
    ) -> Result<Vec<PermissionOverride>, AppError> {
        Ok(self.tables.read().overrides_where(|o| {
            o.scope == OverrideScope::Folder(folder_id)
                && matches!(o.target, OverrideTarget::Role(id) if role_ids.contains(&id))
        }))
    }

    async fn folder_override_for_user(
        &self,
        folder_id: i64,
        user_id: i64,
    ) -> Result<Option<PermissionOverride>, AppError> {
        Ok(self
            .tables
            .read()
            .overrides_where(|o| {
                o.scope == OverrideScope::Folder(folder_id) && o.target == OverrideTarget::User(user_id)
            })
            .into_iter()
            .next())
    }

    async fn channel_overrides_for_roles(
        &self,
        channel_id: i64,
        role_ids: &[i64],
    ) -> Result<Vec<PermissionOverride>, AppError> {
        Ok(self.tables.read().overrides_where(|o| {
            o.scope == OverrideScope::Channel(channel_id)
                && matches!(o.target, OverrideTarget::Role(id) if role_ids.contains(&id))
        }))
    }

    async fn channel_override_for_user(
        &self,
        channel_id: i64,
        user_id: i64,
    ) -> Result<Option<PermissionOverride>, AppError> {
        Ok(self
            .tables
            .read()
            .overrides_where(|o| {
                o.scope == OverrideScope::Channel(channel_id)
                    && o.target == OverrideTarget::User(user_id)
            })
            .into_iter()
            .next())
    }
}

#[async_trait]
impl OverrideStore for InMemoryStore {
    async fn save_override(
        &self,
        payload: &NewPermissionOverride,
    ) -> Result<PermissionOverride, AppError> {
        let mut tables = self.tables.write();
        let scope_exists = match payload.scope {
            OverrideScope::Folder(id) => tables.folders.contains_key(&id),
            OverrideScope::Channel(id) => tables.channels.contains_key(&id),
        };
        let target_exists = match payload.target {
            OverrideTarget::Role(id) => tables.roles.contains_key(&id),
            OverrideTarget::User(_) => true,
        };
        if !scope_exists || !target_exists {
            return Err(AppError::NotFound("Scope or role not found".to_string()));
        }

        let existing = tables
            .overrides
            .values_mut()
            .find(|o| o.scope == payload.scope && o.target == payload.target);
        if let Some(existing) = existing {
            existing.allowed = payload.allowed;
            existing.denied = payload.denied;
            return Ok(existing.clone());
        }

        let saved = PermissionOverride {
            id: tables.next_id(),
            scope: payload.scope,
            target: payload.target,
            allowed: payload.allowed,
            denied: payload.denied,
            created_at: Utc::now(),
        };
        tables.overrides.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete_override(
        &self,
        scope: OverrideScope,
        target: OverrideTarget,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write();
        let before = tables.overrides.len();
        tables
            .overrides
            .retain(|_, o| !(o.scope == scope && o.target == target));
        Ok(tables.overrides.len() < before)
    }

    async fn list_overrides(
        &self,
        scope: OverrideScope,
    ) -> Result<Vec<PermissionOverride>, AppError> {
        let mut overrides = self.tables.read().overrides_where(|o| o.scope == scope);
        overrides.sort_by_key(|o| (o.target.user_id().is_some(), o.id));
        Ok(overrides)
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn find_role(&self, role_id: i64) -> Result<Option<Role>, AppError> {
        Ok(self.tables.read().roles.get(&role_id).cloned())
    }

    async fn find_everyone_role(&self, server_id: i64) -> Result<Option<Role>, AppError> {
        Ok(self
            .tables
            .read()
            .roles
            .values()
            .find(|r| r.server_id == server_id && r.is_everyone)
            .cloned())
    }

    async fn find_active_roles(&self, server_id: i64) -> Result<Vec<Role>, AppError> {
        let mut roles: Vec<Role> = self
            .tables
            .read()
            .roles
            .values()
            .filter(|r| r.server_id == server_id && r.is_active)
            .cloned()
            .collect();
        roles.sort_by(|a, b| b.position.cmp(&a.position).then(a.id.cmp(&b.id)));
        Ok(roles)
    }

    async fn insert_role(&self, role: &NewRole) -> Result<Role, AppError> {
        self.tables.write().insert_role(role)
    }

    async fn update_role(&self, role: &Role) -> Result<Role, AppError> {
        let mut tables = self.tables.write();
        let stored = tables
            .roles
            .get_mut(&role.id)
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", role.id)))?;
        if stored.is_everyone && !role.is_active {
            return Err(AppError::Validation(
                "The everyone role cannot be deactivated".to_string(),
            ));
        }
        stored.name = role.name.clone();
        stored.color = role.color;
        stored.position = role.position;
        stored.permissions = role.permissions;
        stored.mentionable = role.mentionable;
        stored.is_active = role.is_active;
        Ok(stored.clone())
    }

    async fn insert_default_roles(&self, server_id: i64) -> Result<(Role, Role), AppError> {
        // one write guard for both rows: neither is visible without the other
        let mut tables = self.tables.write();
        let everyone = tables.insert_role(&NewRole::everyone(server_id))?;
        let owner = tables.insert_role(&NewRole::owner(server_id))?;
        Ok((everyone, owner))
    }

    async fn assign_role(
        &self,
        server_id: i64,
        user_id: i64,
        role_id: i64,
        _assigned_by: i64,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write();
        if !tables.roles.contains_key(&role_id) {
            return Err(AppError::NotFound(format!("Role {} not found", role_id)));
        }
        let record = tables.member_record_mut(server_id, user_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Member not found in server {} for user {}",
                server_id, user_id
            ))
        })?;
        record.role_ids.insert(role_id);
        Ok(())
    }

    async fn unassign_role(
        &self,
        server_id: i64,
        user_id: i64,
        role_id: i64,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write();
        let record = tables.member_record_mut(server_id, user_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Member not found in server {} for user {}",
                server_id, user_id
            ))
        })?;
        Ok(record.role_ids.remove(&role_id))
    }

    async fn set_personal_permissions(
        &self,
        server_id: i64,
        user_id: i64,
        permissions: Permissions,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write();
        let record = tables.member_record_mut(server_id, user_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Member not found in server {} for user {}",
                server_id, user_id
            ))
        })?;
        record.member.personal_permissions = permissions;
        Ok(())
    }
}
