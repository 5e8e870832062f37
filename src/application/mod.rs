//! Application Layer
//!
//! Services that sit between callers and the domain: role and override
//! management, and the cached permission checker.

pub mod services;
