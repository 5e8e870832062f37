//! Cascading deletes in the in-memory store and their effect on checks.

use chat_permissions::domain::services::PermissionChecker;
use chat_permissions::domain::{Permission, Permissions};
use chat_permissions::infrastructure::memory::StoreCounts;
use pretty_assertions::assert_eq;

use crate::common::TestWorld;

#[tokio::test]
async fn test_deleting_channel_drops_its_overrides() {
    let world = TestWorld::new().await;
    let user = world.join();
    world
        .user_override(world.channel(), user, Permissions::NOTHING, Permission::ViewChannel)
        .await;
    world
        .user_override(world.folder(), user, Permission::Speak, Permissions::NOTHING)
        .await;
    assert_eq!(world.store.counts().overrides, 2);

    assert!(world.store.delete_channel(world.channel_id));

    assert_eq!(world.store.counts().overrides, 1);
    assert_eq!(world.store.counts().channels, 0);
    assert!(!world.permissions.can_view(user, world.channel()).await);
    assert!(world.has(user, world.folder(), Permission::Speak).await);
}

#[tokio::test]
async fn test_deleting_folder_drops_channels_and_overrides() {
    let world = TestWorld::new().await;
    let user = world.join();
    let second = world.store.add_channel(world.folder_id, "voice").unwrap();
    world
        .role_override(world.folder(), world.everyone_role_id, Permission::Speak, Permissions::NOTHING)
        .await;
    world
        .role_override(world.channel(), world.everyone_role_id, Permission::Connect, Permissions::NOTHING)
        .await;

    assert!(world.store.delete_folder(world.folder_id));

    let counts = world.store.counts();
    assert_eq!((counts.folders, counts.channels, counts.overrides), (0, 0, 0));
    assert!(!world.permissions.can_send_messages(user, second).await);
}

#[tokio::test]
async fn test_deleting_role_drops_assignments_and_overrides() {
    let world = TestWorld::new().await;
    let user = world.join();
    let role = world.create_role(Permission::KickMembers).await;
    world.grant(user, role).await;
    world
        .role_override(world.channel(), role, Permission::ManageMessages, Permissions::NOTHING)
        .await;
    let before = world.store.counts();

    assert!(world.store.delete_role(role));

    let after = world.store.counts();
    assert_eq!(after.assignments, before.assignments - 1);
    assert_eq!(after.overrides, before.overrides - 1);
    assert!(!world.permissions.can_kick_members(user, world.server_id).await);
    assert!(!world.has(user, world.channel(), Permission::ManageMessages).await);
}

#[tokio::test]
async fn test_deleting_server_removes_everything() {
    let world = TestWorld::new().await;
    let user = world.join();
    world
        .user_override(world.channel(), user, Permission::Speak, Permissions::NOTHING)
        .await;

    assert!(world.store.delete_server(world.server_id));
    assert!(!world.store.delete_server(world.server_id));

    assert_eq!(world.store.counts(), StoreCounts::default());
    assert!(!world.permissions.is_server_member(world.owner_id, world.server_id).await);
    assert!(!world.permissions.can_view(world.owner_id, world.channel()).await);
}
