//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! - **Permission**: one named capability bit
//! - **Permissions**: 64-bit capability mask with bit helpers
//! - **Scope**: the server, folder or channel a check is evaluated against

mod permissions;
mod scope;

pub use permissions::*;
pub use scope::*;
