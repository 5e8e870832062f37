//! # Domain Layer
//!
//! The permission model and its resolution rules. Independent of the
//! database and cache implementations.
//!
//! ## Structure
//!
//! - **entities**: Roles, members, folders, channels, overrides and the store traits
//! - **value_objects**: `Permission`, `Permissions`, `Scope`
//! - **services**: role aggregation, pure resolvers and the decision facade

pub mod entities;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
