//! Infrastructure Layer
//!
//! Implementations of the domain store and cache traits:
//! - PostgreSQL repositories and migrations
//! - An in-memory arena store
//! - Redis and in-process permission caches
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod repositories;
