//! Capability flags.
//!
//! Every capability occupies exactly one bit of a 64-bit mask. The set is
//! closed: bits 22..63 are reserved and never produced by this module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single named capability.
///
/// The discriminant is the capability's bit value, so `permission as u64`
/// is always a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u64)]
pub enum Permission {
    /// See a folder or channel and its name
    ViewChannel = 1 << 0,
    /// Post messages in a channel
    SendMessages = 1 << 1,
    /// Read messages posted before joining
    ReadMessageHistory = 1 << 2,
    /// Links are rendered as embeds
    EmbedLinks = 1 << 3,
    /// Upload files
    AttachFiles = 1 << 4,
    /// Edit messages written by other members
    EditMessages = 1 << 5,
    /// Join voice channels
    Connect = 1 << 6,
    /// Speak in voice channels
    Speak = 1 << 7,
    /// Mute other members in voice
    MuteMembers = 1 << 8,
    /// Deafen other members in voice
    DeafenMembers = 1 << 9,
    /// Move members between voice channels
    MoveMembers = 1 << 10,
    /// Delete or pin messages of other members
    ManageMessages = 1 << 11,
    /// Create, edit and delete folders and channels
    ManageChannels = 1 << 12,
    /// Edit folder and channel overrides, personal grants
    ManagePermissions = 1 << 13,
    /// Change own nickname
    ChangeNickname = 1 << 14,
    /// Change nicknames of other members
    ManageNicknames = 1 << 15,
    /// Remove members from the server
    KickMembers = 1 << 16,
    /// Ban members from the server
    BanMembers = 1 << 17,
    /// Create, edit, assign and deactivate roles
    ManageRoles = 1 << 18,
    /// Edit server settings
    ManageServer = 1 << 19,
    /// Create invites
    CreateInvite = 1 << 20,
    /// Bypasses every other check when held through an active role
    Administrator = 1 << 21,
}

impl Permission {
    /// Every capability, in bit order.
    pub const ALL: [Permission; 22] = [
        Permission::ViewChannel,
        Permission::SendMessages,
        Permission::ReadMessageHistory,
        Permission::EmbedLinks,
        Permission::AttachFiles,
        Permission::EditMessages,
        Permission::Connect,
        Permission::Speak,
        Permission::MuteMembers,
        Permission::DeafenMembers,
        Permission::MoveMembers,
        Permission::ManageMessages,
        Permission::ManageChannels,
        Permission::ManagePermissions,
        Permission::ChangeNickname,
        Permission::ManageNicknames,
        Permission::KickMembers,
        Permission::BanMembers,
        Permission::ManageRoles,
        Permission::ManageServer,
        Permission::CreateInvite,
        Permission::Administrator,
    ];

    /// The bit this capability occupies.
    pub const fn bit(self) -> u64 {
        self as u64
    }

    /// Stable upper-case name, as used in config files and error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ViewChannel => "VIEW_CHANNEL",
            Self::SendMessages => "SEND_MESSAGES",
            Self::ReadMessageHistory => "READ_MESSAGE_HISTORY",
            Self::EmbedLinks => "EMBED_LINKS",
            Self::AttachFiles => "ATTACH_FILES",
            Self::EditMessages => "EDIT_MESSAGES",
            Self::Connect => "CONNECT",
            Self::Speak => "SPEAK",
            Self::MuteMembers => "MUTE_MEMBERS",
            Self::DeafenMembers => "DEAFEN_MEMBERS",
            Self::MoveMembers => "MOVE_MEMBERS",
            Self::ManageMessages => "MANAGE_MESSAGES",
            Self::ManageChannels => "MANAGE_CHANNELS",
            Self::ManagePermissions => "MANAGE_PERMISSIONS",
            Self::ChangeNickname => "CHANGE_NICKNAME",
            Self::ManageNicknames => "MANAGE_NICKNAMES",
            Self::KickMembers => "KICK_MEMBERS",
            Self::BanMembers => "BAN_MEMBERS",
            Self::ManageRoles => "MANAGE_ROLES",
            Self::ManageServer => "MANAGE_SERVER",
            Self::CreateInvite => "CREATE_INVITE",
            Self::Administrator => "ADMINISTRATOR",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown capability name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPermission(wanted.to_string()))
    }
}

/// 64-bit capability mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(u64);

impl Permissions {
    /// No capability at all.
    pub const NOTHING: Self = Self(0);

    /// Every defined capability.
    pub const ALL: Self = Self((1 << 22) - 1);

    /// Grant of the auto-created everyone role.
    pub const EVERYONE_DEFAULT: Self = Self(
        Permission::ViewChannel.bit()
            | Permission::SendMessages.bit()
            | Permission::ReadMessageHistory.bit(),
    );

    /// Build a mask, dropping reserved bits.
    pub const fn from_bits_truncate(bits: u64) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Decode the signed `BIGINT` column the stores persist masks in.
    pub const fn from_storage(value: i64) -> Self {
        Self::from_bits_truncate(value as u64)
    }

    /// Encode for a signed `BIGINT` column.
    pub const fn to_storage(self) -> i64 {
        self.0 as i64
    }

    /// Raw bits.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// `(mask & bit) != 0`. ADMINISTRATOR gets no special treatment here.
    pub const fn has(self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set a capability in place.
    pub fn add(&mut self, permission: Permission) {
        self.0 |= permission.bit();
    }

    /// Clear a capability in place.
    pub fn remove(&mut self, permission: Permission) {
        self.0 &= !permission.bit();
    }

    /// By-value variant of [`add`](Self::add).
    #[must_use]
    pub const fn with(self, permission: Permission) -> Self {
        Self(self.0 | permission.bit())
    }

    /// By-value variant of [`remove`](Self::remove).
    #[must_use]
    pub const fn without(self, permission: Permission) -> Self {
        Self(self.0 & !permission.bit())
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Bits of `self` that are not in `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Iterate over the capabilities contained in the mask, in bit order.
    pub fn iter(self) -> impl Iterator<Item = Permission> {
        Permission::ALL.into_iter().filter(move |p| self.has(*p))
    }
}

impl From<Permission> for Permissions {
    fn from(permission: Permission) -> Self {
        Self(permission.bit())
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NOTHING, Self::with)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NOTHING");
        }
        let mut first = true;
        for permission in self.iter() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(permission.name())?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Permissions {
    type Err = UnknownPermission;

    /// Parse `"VIEW_CHANNEL | SEND_MESSAGES"`. `"NOTHING"` and `""` are empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('|')
            .map(str::trim)
            .filter(|part| !part.is_empty() && !part.eq_ignore_ascii_case("NOTHING"))
            .map(Permission::from_str)
            .collect()
    }
}

impl std::ops::BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOr<Permission> for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Permission) -> Self::Output {
        self.with(rhs)
    }
}

impl std::ops::BitOr for Permission {
    type Output = Permissions;

    fn bitor(self, rhs: Self) -> Self::Output {
        Permissions::from(self).with(rhs)
    }
}

impl std::ops::BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for Permissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(rhs)
    }
}

impl std::ops::Not for Permissions {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0 & Self::ALL.0)
    }
}
