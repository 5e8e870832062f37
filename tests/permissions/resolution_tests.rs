//! Permission resolution through the facade over the in-memory store.

use chat_permissions::domain::services::PermissionChecker;
use chat_permissions::domain::{Permission, Permissions, Role, RoleStore, Scope};
use pretty_assertions::assert_eq;
use test_case::test_case;

use crate::common::{random_user_id, TestWorld};

const SEND: Permission = Permission::SendMessages;
const VIEW: Permission = Permission::ViewChannel;

#[tokio::test]
async fn test_plain_member_gets_everyone_grant_everywhere() {
    let world = TestWorld::new().await;
    let user = world.join();

    for scope in [world.server(), world.folder(), world.channel()] {
        assert_eq!(
            world.permissions.effective_permissions(user, scope).await,
            Permissions::EVERYONE_DEFAULT,
            "at {scope}"
        );
    }
    assert!(!world.has(user, world.server(), Permission::BanMembers).await);
}

#[tokio::test]
async fn test_administrator_bypasses_every_deny() {
    let world = TestWorld::new().await;
    let admin = world.join();
    let admin_role = world.create_role(Permission::Administrator).await;
    world.grant(admin, admin_role).await;

    for scope in [world.folder(), world.channel()] {
        world
            .role_override(scope, world.everyone_role_id, Permissions::NOTHING, Permissions::ALL)
            .await;
        world
            .role_override(scope, admin_role, Permissions::NOTHING, Permissions::ALL)
            .await;
        world
            .user_override(scope, admin, Permissions::NOTHING, Permissions::ALL)
            .await;
    }

    for scope in [world.server(), world.folder(), world.channel()] {
        for permission in Permission::ALL {
            assert!(world.has(admin, scope, permission).await, "{permission} at {scope}");
        }
    }
}

#[tokio::test]
async fn test_owner_role_is_administrator() {
    let world = TestWorld::new().await;
    world
        .user_override(world.channel(), world.owner_id, Permissions::NOTHING, Permissions::ALL)
        .await;

    assert_eq!(
        world
            .permissions
            .effective_permissions(world.owner_id, world.channel())
            .await,
        Permissions::ALL
    );
}

#[tokio::test]
async fn test_personal_administrator_bit_is_not_a_bypass() {
    let world = TestWorld::new().await;
    let user = world.join();
    world.set_personal(user, Permission::Administrator).await;
    world
        .user_override(world.folder(), user, Permissions::NOTHING, VIEW)
        .await;

    assert!(world.has(user, world.server(), Permission::Administrator).await);
    assert!(!world.has(user, world.server(), Permission::BanMembers).await);
    assert!(!world.has(user, world.folder(), VIEW).await);
}

#[tokio::test]
async fn test_folder_deny_is_inherited_by_channel() {
    let world = TestWorld::new().await;
    let user = world.join();
    world
        .role_override(world.folder(), world.everyone_role_id, Permissions::NOTHING, SEND)
        .await;

    assert!(!world.has(user, world.folder(), SEND).await);
    assert!(!world.has(user, world.channel(), SEND).await);
    assert!(world.has(user, world.channel(), VIEW).await);
}

#[tokio::test]
async fn test_personal_grant_does_not_lift_inherited_deny() {
    let world = TestWorld::new().await;
    let user = world.join();
    world.set_personal(user, SEND).await;
    world
        .user_override(world.folder(), user, Permissions::NOTHING, SEND)
        .await;

    assert!(!world.has(user, world.folder(), SEND).await);
    assert!(!world.has(user, world.channel(), SEND).await);
}

#[tokio::test]
async fn test_channel_allow_is_an_exception_to_folder_deny() {
    let world = TestWorld::new().await;
    let user = world.join();
    let other = world.join();
    let speakers = world.create_role(Permissions::NOTHING).await;
    world.grant(user, speakers).await;

    world
        .role_override(world.folder(), world.everyone_role_id, Permissions::NOTHING, SEND)
        .await;
    world
        .role_override(world.channel(), speakers, SEND, Permissions::NOTHING)
        .await;

    assert!(!world.has(user, world.folder(), SEND).await);
    assert!(world.has(user, world.channel(), SEND).await);
    // the exception only reaches holders of the role
    assert!(!world.has(other, world.channel(), SEND).await);
}

#[tokio::test]
async fn test_channel_deny_is_an_exception_to_folder_allow() {
    let world = TestWorld::new().await;
    let user = world.join();
    world
        .role_override(world.folder(), world.everyone_role_id, Permission::AttachFiles, Permissions::NOTHING)
        .await;
    world
        .role_override(world.channel(), world.everyone_role_id, Permissions::NOTHING, Permission::AttachFiles)
        .await;

    assert!(world.has(user, world.folder(), Permission::AttachFiles).await);
    assert!(!world.has(user, world.channel(), Permission::AttachFiles).await);
}

#[tokio::test]
async fn test_everyone_folder_deny_channel_allow_example() {
    let world = TestWorld::new().await;
    world.set_everyone(VIEW | SEND).await;
    let user = world.join();
    world
        .role_override(world.folder(), world.everyone_role_id, Permissions::NOTHING, SEND)
        .await;
    world
        .role_override(world.channel(), world.everyone_role_id, SEND, Permissions::NOTHING)
        .await;

    assert!(!world.has(user, world.folder(), SEND).await);
    assert!(world.has(user, world.channel(), SEND).await);
}

#[tokio::test]
async fn test_redundant_channel_deny_example() {
    let world = TestWorld::new().await;
    world.set_everyone(VIEW | SEND).await;
    let user = world.join();
    world
        .role_override(world.folder(), world.everyone_role_id, Permissions::NOTHING, SEND)
        .await;
    world
        .role_override(world.channel(), world.everyone_role_id, Permissions::NOTHING, SEND)
        .await;

    assert!(!world.has(user, world.channel(), SEND).await);
}

#[tokio::test]
async fn test_personal_folder_deny_beats_role_grant_example() {
    let world = TestWorld::new().await;
    let user = world.join();
    let viewers = world.create_role(VIEW).await;
    world.grant(user, viewers).await;
    world
        .user_override(world.folder(), user, Permissions::NOTHING, VIEW)
        .await;

    assert!(!world.has(user, world.folder(), VIEW).await);
    assert!(world.has(world.join(), world.folder(), VIEW).await);
}

#[derive(Debug, Clone, Copy)]
enum AllowSource {
    Role,
    FolderOverride,
    ChannelOverride,
    Personal,
}

#[derive(Debug, Clone, Copy)]
enum DenySource {
    FolderRole,
    FolderUser,
    ChannelRole,
    ChannelUser,
}

#[test_case(AllowSource::Role, DenySource::ChannelRole)]
#[test_case(AllowSource::Role, DenySource::ChannelUser)]
#[test_case(AllowSource::Role, DenySource::FolderUser)]
#[test_case(AllowSource::FolderOverride, DenySource::FolderRole)]
#[test_case(AllowSource::FolderOverride, DenySource::ChannelUser)]
#[test_case(AllowSource::ChannelOverride, DenySource::ChannelRole)]
#[test_case(AllowSource::ChannelOverride, DenySource::ChannelUser)]
#[test_case(AllowSource::Personal, DenySource::FolderRole)]
#[test_case(AllowSource::Personal, DenySource::ChannelUser)]
#[tokio::test]
async fn test_deny_wins_over_any_allow_source(allow: AllowSource, deny: DenySource) {
    let world = TestWorld::new().await;
    let user = world.join();
    let moderators = world.create_role(Permissions::NOTHING).await;
    world.grant(user, moderators).await;
    let permission = Permission::ManageMessages;

    match allow {
        AllowSource::Role => {
            let granting = world.create_role(permission).await;
            world.grant(user, granting).await;
        }
        AllowSource::FolderOverride => {
            world
                .role_override(world.folder(), moderators, permission, Permissions::NOTHING)
                .await
        }
        AllowSource::ChannelOverride => {
            world
                .role_override(world.channel(), moderators, permission, Permissions::NOTHING)
                .await
        }
        AllowSource::Personal => world.set_personal(user, permission).await,
    }
    match deny {
        DenySource::FolderRole => {
            world
                .role_override(world.folder(), world.everyone_role_id, Permissions::NOTHING, permission)
                .await
        }
        DenySource::FolderUser => {
            world
                .user_override(world.folder(), user, Permissions::NOTHING, permission)
                .await
        }
        DenySource::ChannelRole => {
            world
                .role_override(world.channel(), world.everyone_role_id, Permissions::NOTHING, permission)
                .await
        }
        DenySource::ChannelUser => {
            world
                .user_override(world.channel(), user, Permissions::NOTHING, permission)
                .await
        }
    }

    assert!(!world.has(user, world.channel(), permission).await);
}

#[tokio::test]
async fn test_member_without_grants_is_denied_everything() {
    let world = TestWorld::new().await;
    world.set_everyone(Permissions::NOTHING).await;
    let user = world.join();

    for scope in [world.server(), world.folder(), world.channel()] {
        for permission in Permission::ALL {
            assert!(!world.has(user, scope, permission).await, "{permission} at {scope}");
        }
    }
}

#[tokio::test]
async fn test_non_member_and_inactive_member_are_denied() {
    let world = TestWorld::new().await;
    let stranger = random_user_id();
    assert!(!world.has(stranger, world.channel(), VIEW).await);
    assert!(!world.permissions.is_server_member(stranger, world.server_id).await);

    let user = world.join();
    world.store.deactivate_member(world.server_id, user).unwrap();
    assert!(!world.has(user, world.channel(), VIEW).await);
    assert!(!world.permissions.is_server_member(user, world.server_id).await);

    // rejoining restores the membership
    world.store.add_member(world.server_id, user).unwrap();
    assert!(world.has(user, world.channel(), VIEW).await);
}

#[tokio::test]
async fn test_inactive_role_contributes_nothing() {
    let world = TestWorld::new().await;
    let user = world.join();
    let banners = world.create_role(Permission::BanMembers).await;
    world.grant(user, banners).await;
    world
        .role_override(world.channel(), banners, Permission::ManageMessages, Permissions::NOTHING)
        .await;
    assert!(world.permissions.can_ban_members(user, world.server_id).await);
    assert!(world.has(user, world.channel(), Permission::ManageMessages).await);

    let mut role = world.store.find_role(banners).await.unwrap().unwrap();
    role.is_active = false;
    world.store.update_role(&role).await.unwrap();

    assert!(!world.permissions.can_ban_members(user, world.server_id).await);
    assert!(!world.has(user, world.channel(), Permission::ManageMessages).await);
}

#[tokio::test]
async fn test_overrides_only_apply_to_their_target() {
    let world = TestWorld::new().await;
    let user = world.join();
    let other = world.join();
    let unheld = world.create_role(Permissions::NOTHING).await;
    world
        .role_override(world.channel(), unheld, Permissions::NOTHING, VIEW)
        .await;
    world
        .user_override(world.channel(), other, Permissions::NOTHING, VIEW)
        .await;

    assert!(world.permissions.can_view(user, world.channel()).await);
    assert!(!world.permissions.can_view(other, world.channel()).await);
}

#[tokio::test]
async fn test_unknown_scopes_fail_closed() {
    let world = TestWorld::new().await;
    let user = world.join();

    assert!(!world.permissions.can_send_messages(user, 987_654).await);
    assert!(!world.has(user, Scope::Folder(987_654), VIEW).await);
    assert!(!world.has(user, Scope::Server(987_654), VIEW).await);
}

#[tokio::test]
async fn test_has_permission_agrees_with_effective_mask() {
    let world = TestWorld::new().await;
    let user = world.join();
    let role = world.create_role(Permission::KickMembers | Permission::Connect).await;
    world.grant(user, role).await;
    world
        .role_override(world.folder(), role, Permission::Speak, Permission::Connect)
        .await;
    world
        .user_override(world.channel(), user, Permission::Connect, VIEW)
        .await;

    for scope in [world.server(), world.folder(), world.channel()] {
        let effective = world.permissions.effective_permissions(user, scope).await;
        for permission in Permission::ALL {
            assert_eq!(
                world.has(user, scope, permission).await,
                effective.has(permission),
                "{permission} at {scope}"
            );
        }
    }
}

#[tokio::test]
async fn test_repeated_checks_are_stable() {
    let world = TestWorld::new().await;
    let user = world.join();
    world
        .role_override(world.folder(), world.everyone_role_id, Permissions::NOTHING, SEND)
        .await;

    let first = world.permissions.effective_permissions(user, world.channel()).await;
    let second = world.permissions.effective_permissions(user, world.channel()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_require_permission_names_the_missing_bit() {
    let world = TestWorld::new().await;
    let user = world.join();

    let err = world
        .permissions
        .require_permission(user, world.server(), Permission::ManageServer)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("MANAGE_SERVER"), "{err}");
    assert!(world
        .permissions
        .require_permission(user, world.channel(), VIEW)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_server_permissions_and_member_roles() {
    let world = TestWorld::new().await;
    let user = world.join();
    let low = world.create_role(Permission::KickMembers).await;
    let high = world.create_role(Permission::CreateInvite).await;
    let mut high_role: Role = world.store.find_role(high).await.unwrap().unwrap();
    high_role.position = 500;
    world.store.update_role(&high_role).await.unwrap();
    world.grant(user, low).await;
    world.grant(user, high).await;
    world.set_personal(user, Permission::ChangeNickname).await;

    assert_eq!(
        world.permissions.server_permissions(user, world.server_id).await,
        Permissions::EVERYONE_DEFAULT
            | Permission::KickMembers
            | Permission::CreateInvite
            | Permission::ChangeNickname
    );
    assert_eq!(
        world
            .permissions
            .server_permissions(world.owner_id, world.server_id)
            .await,
        Permissions::from(Permission::Administrator)
    );

    let roles = world.permissions.member_roles(user, world.server_id).await;
    assert_eq!(roles.first().map(|r| r.id), Some(high));
    assert!(roles.iter().any(|r| r.is_everyone));
    assert!(roles.windows(2).all(|w| w[0].position >= w[1].position));
}
