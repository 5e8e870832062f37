//! Override management through the override service.

use chat_permissions::application::services::{OverrideError, OverrideService, SetOverrideDto};
use chat_permissions::domain::services::PermissionChecker;
use chat_permissions::domain::{Permission, Permissions, RoleStore, Scope};
use pretty_assertions::assert_eq;
use test_case::test_case;

use crate::common::TestWorld;

fn deny_send_for_role(role_id: i64) -> SetOverrideDto {
    SetOverrideDto {
        role_id: Some(role_id),
        denied: Permission::SendMessages.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_set_override_takes_effect() {
    let world = TestWorld::new().await;
    let service = world.override_service();
    let user = world.join();

    let dto = service
        .set_override(world.folder(), world.owner_id, deny_send_for_role(world.everyone_role_id))
        .await
        .unwrap();
    assert_eq!(dto.scope, world.folder().to_string());
    assert_eq!(dto.role_id, Some(world.everyone_role_id));

    assert!(!world.permissions.can_send_messages(user, world.channel_id).await);
}

#[tokio::test]
async fn test_saving_twice_replaces_the_override() {
    let world = TestWorld::new().await;
    let service = world.override_service();
    let user = world.join();

    let first = service
        .set_override(world.channel(), world.owner_id, deny_send_for_role(world.everyone_role_id))
        .await
        .unwrap();
    let second = service
        .set_override(
            world.channel(),
            world.owner_id,
            SetOverrideDto {
                role_id: Some(world.everyone_role_id),
                allowed: Permission::AttachFiles.into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(world.store.counts().overrides, 1);
    assert!(world.permissions.can_send_messages(user, world.channel_id).await);
    assert!(world.has(user, world.channel(), Permission::AttachFiles).await);
}

#[test_case(Some(1), Some(2) ; "both targets")]
#[test_case(None, None ; "no target")]
#[tokio::test]
async fn test_malformed_target_is_rejected(role_id: Option<i64>, user_id: Option<i64>) {
    let world = TestWorld::new().await;
    let service = world.override_service();

    let result = service
        .set_override(
            world.channel(),
            world.owner_id,
            SetOverrideDto {
                role_id,
                user_id,
                denied: Permissions::ALL,
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(OverrideError::Invalid(_))), "{result:?}");
    assert_eq!(world.store.counts().overrides, 0);
}

#[tokio::test]
async fn test_server_scope_has_no_overrides() {
    let world = TestWorld::new().await;
    let result = world
        .override_service()
        .set_override(world.server(), world.owner_id, deny_send_for_role(world.everyone_role_id))
        .await;
    assert!(matches!(result, Err(OverrideError::Invalid(_))));
}

#[tokio::test]
async fn test_unknown_scope_and_role() {
    let world = TestWorld::new().await;
    let service = world.override_service();

    let result = service
        .set_override(Scope::Channel(555_555), world.owner_id, deny_send_for_role(world.everyone_role_id))
        .await;
    assert!(matches!(result, Err(OverrideError::ScopeNotFound)));

    let result = service
        .set_override(world.channel(), world.owner_id, deny_send_for_role(555_555))
        .await;
    assert!(matches!(result, Err(OverrideError::RoleNotFound)));
}

#[tokio::test]
async fn test_role_target_must_belong_to_scope_server() {
    let world = TestWorld::new().await;
    let other_server = world.store.add_server("elsewhere", world.owner_id);
    let (foreign_everyone, _) = world.store.insert_default_roles(other_server).await.unwrap();

    let result = world
        .override_service()
        .set_override(world.folder(), world.owner_id, deny_send_for_role(foreign_everyone.id))
        .await;
    assert!(matches!(result, Err(OverrideError::WrongServer)));
}

#[tokio::test]
async fn test_manage_permissions_is_checked_on_the_scope() {
    let world = TestWorld::new().await;
    let service = world.override_service();
    let user = world.join();

    let result = service.list_overrides(world.channel(), user).await;
    assert!(matches!(result, Err(OverrideError::Forbidden)));

    // granted on the channel only
    world
        .user_override(world.channel(), user, Permission::ManagePermissions, Permissions::NOTHING)
        .await;

    let listed = service.list_overrides(world.channel(), user).await.unwrap();
    assert_eq!(listed.len(), 1);
    let result = service.list_overrides(world.folder(), user).await;
    assert!(matches!(result, Err(OverrideError::Forbidden)));
}

#[tokio::test]
async fn test_list_puts_role_targets_first() {
    let world = TestWorld::new().await;
    let service = world.override_service();
    let user = world.join();

    service
        .set_override(
            world.folder(),
            world.owner_id,
            SetOverrideDto {
                user_id: Some(user),
                denied: Permission::ViewChannel.into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    service
        .set_override(world.folder(), world.owner_id, deny_send_for_role(world.everyone_role_id))
        .await
        .unwrap();

    let listed = service.list_overrides(world.folder(), world.owner_id).await.unwrap();
    let targets: Vec<(Option<i64>, Option<i64>)> =
        listed.iter().map(|o| (o.role_id, o.user_id)).collect();
    assert_eq!(
        targets,
        vec![(Some(world.everyone_role_id), None), (None, Some(user))]
    );
}

#[tokio::test]
async fn test_clear_override() {
    let world = TestWorld::new().await;
    let service = world.override_service();
    let user = world.join();
    service
        .set_override(world.folder(), world.owner_id, deny_send_for_role(world.everyone_role_id))
        .await
        .unwrap();
    assert!(!world.permissions.can_send_messages(user, world.channel_id).await);

    let removed = service
        .clear_override(world.folder(), world.owner_id, Some(world.everyone_role_id), None)
        .await
        .unwrap();
    assert!(removed);
    assert!(world.permissions.can_send_messages(user, world.channel_id).await);

    let removed = service
        .clear_override(world.folder(), world.owner_id, Some(world.everyone_role_id), None)
        .await
        .unwrap();
    assert!(!removed);
}

#[tokio::test]
async fn test_override_for_inactive_role_is_ignored() {
    let world = TestWorld::new().await;
    let user = world.join();
    let muted = world.create_role(Permissions::NOTHING).await;
    world.grant(user, muted).await;
    world
        .override_service()
        .set_override(world.channel(), world.owner_id, deny_send_for_role(muted))
        .await
        .unwrap();
    assert!(!world.permissions.can_send_messages(user, world.channel_id).await);

    let mut role = world.store.find_role(muted).await.unwrap().unwrap();
    role.is_active = false;
    world.store.update_role(&role).await.unwrap();

    assert!(world.permissions.can_send_messages(user, world.channel_id).await);
}
