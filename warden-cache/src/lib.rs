//! Warden Cache - Cache Store Layer
//!
//! The fast, possibly-stale, possibly-unavailable side of access control:
//! credential → thing mappings and channel → member-set projections, stored
//! under namespaced keys.
//!
//! # Key Layout
//!
//! | Fact | Redis type | Key |
//! |------|------------|-----|
//! | credential → thing id | string | `thing_key:<credential>` |
//! | channel members | set | `channel:<channel id>` |
//!
//! The layout is shared with every external writer; see [`keys`].

pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod traits;

pub use keys::{KeyNamespace, NamespacedKey, CHANNEL_PREFIX, KEY_SCHEMA_VERSION, THING_KEY_PREFIX};
pub use memory::InMemoryCacheStore;
pub use redis_store::RedisCacheStore;
pub use traits::{CacheStore, CacheWriter};
