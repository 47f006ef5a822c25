//! Warden Resolver - Access Control Cache Layer
//!
//! Answers the two questions asked on every message path:
//!
//! - **identify**: which thing owns this thing key?
//! - **authorize**: may this thing act on this channel?
//!
//! Both consult the [`CacheStore`](warden_cache::CacheStore) first and fall
//! back to the [`RemoteAuthority`](warden_authority::RemoteAuthority) on a
//! miss. The cache is never authoritative for a negative answer and is never
//! written by the resolver.

pub mod resolution;
pub mod resolver;

pub use resolution::{Resolution, ResolutionSource};
pub use resolver::AccessResolver;
