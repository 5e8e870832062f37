//! Permission scopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The level a permission check is evaluated at.
///
/// Servers contain folders, folders contain channels. The id is the primary
/// key of the server, folder or channel row respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    Server(i64),
    Folder(i64),
    Channel(i64),
}

/// Kind of a [`Scope`] without its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Server,
    Folder,
    Channel,
}

impl Scope {
    pub const fn kind(&self) -> ScopeKind {
        match self {
            Self::Server(_) => ScopeKind::Server,
            Self::Folder(_) => ScopeKind::Folder,
            Self::Channel(_) => ScopeKind::Channel,
        }
    }

    pub const fn id(&self) -> i64 {
        match self {
            Self::Server(id) | Self::Folder(id) | Self::Channel(id) => *id,
        }
    }

    /// Rebuild a scope from its kind and id.
    pub const fn new(kind: ScopeKind, id: i64) -> Self {
        match kind {
            ScopeKind::Server => Self::Server(id),
            ScopeKind::Folder => Self::Folder(id),
            ScopeKind::Channel => Self::Channel(id),
        }
    }
}

impl ScopeKind {
    /// Label used in logs, metric labels and cache keys.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Folder => "folder",
            Self::Channel => "channel",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}
