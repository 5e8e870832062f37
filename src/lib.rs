//! # Chat Permissions
//!
//! Permission resolution for a Discord-style chat backend:
//! - 64-bit permission masks granted through roles and personal grants
//! - Folder and channel allow/deny overrides for roles and single users
//! - One facade answering "may this user do that here?", failing closed
//! - PostgreSQL and in-memory stores, Redis and in-memory mask caches
//!
//! ## Architecture
//!
//! - **Domain Layer**: Entities, store traits, pure resolvers and the facade
//! - **Application Layer**: Role and override management, cached checker
//! - **Infrastructure Layer**: Database, cache and metrics implementations
//!
//! ## Module Structure
//!
//! ```text
//! chat_permissions/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, resolvers and the facade
//! +-- application/    Role/override services and the cached checker
//! +-- infrastructure/ PostgreSQL, in-memory, Redis and Prometheus
//! +-- shared/         Common error type
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chat_permissions::domain::services::{PermissionChecker, PermissionService};
//! use chat_permissions::infrastructure::memory::InMemoryStore;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let permissions = PermissionService::new(store.clone(), store.clone(), store);
//! if permissions.can_send_messages(user_id, channel_id).await { /* ... */ }
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Shared utilities
pub mod shared;

// Telemetry and observability
pub mod telemetry;
