//! CDS Console Entity Cache
//!
//! Holds the last-known-good server representation of every child entity
//! loaded during a console session.
//!
//! # Core Concepts
//!
//! - [`CacheKey`]: `(project key, entity name)`, displayed as `project/name`
//! - [`EntityCache`]: one cache per entity kind, values shared as `Arc`
//! - [`CacheSnapshot`]: persistent copy handed to readers; later writes never
//!   show through an earlier snapshot
//!
//! # Example
//!
//! ```rust,ignore
//! use cds_cache::{CacheKey, EntityCache};
//!
//! let cache = EntityCache::new();
//! let key = CacheKey::new(project.clone(), "app1");
//! cache.load(key.clone(), app);
//! cache.mark_external(&key);
//! assert!(cache.is_external(&key));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod cache;
mod key;

pub use cache::{CacheEntry, CacheSnapshot, CacheStats, EntityCache};
pub use key::CacheKey;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
