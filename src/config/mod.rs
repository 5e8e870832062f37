//! # Configuration Module
//!
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__, plus DATABASE_URL / REDIS_URL)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_permissions::config::Settings;
//!
//! let settings = Settings::load()?;
//! if settings.permissions.cache_enabled {
//!     println!("caching masks for {}s", settings.permissions.cache_ttl_secs);
//! }
//! ```

mod settings;

pub use settings::*;
