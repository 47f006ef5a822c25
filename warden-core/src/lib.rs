//! Warden Core - Shared Types
//!
//! Identifier newtypes, per-call context, the error taxonomy, configuration
//! and the inbound [`AccessControl`] contract. Every other Warden crate
//! depends on this one; it contains no I/O beyond reading a config file.

pub mod access;
pub mod config;
pub mod context;
pub mod error;
pub mod ids;

pub use access::AccessControl;
pub use config::{AuthorityConfig, CacheStoreConfig, ResolverConfig, TelemetryConfig, WardenConfig};
pub use context::{CallContext, CancellationToken, Interrupted};
pub use error::{
    AccessError, AuthorityError, CacheError, ConfigError, ValidationError, WardenError,
    WardenResult,
};
pub use ids::{ChannelId, Credential, ThingId};
