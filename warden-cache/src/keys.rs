//! Namespaced cache keys.
//!
//! The cache holds two unrelated identifier spaces: thing keys (credentials)
//! and channel ids. A channel id and a thing key may well be the same string,
//! so every key carries its namespace as a literal prefix. The prefixes are a
//! wire contract with whatever process populates the cache; changing them
//! means bumping [`KEY_SCHEMA_VERSION`] and migrating every writer.

use std::fmt;

use warden_core::{ChannelId, Credential};

/// Version of the key layout below. Writers and readers must agree on it.
pub const KEY_SCHEMA_VERSION: u32 = 1;

/// Prefix for credential → thing id mappings (string values).
pub const THING_KEY_PREFIX: &str = "thing_key";

/// Prefix for channel → connected thing ids (set values).
pub const CHANNEL_PREFIX: &str = "channel";

/// Separator between prefix and identifier.
pub const SEPARATOR: char = ':';

/// Kind of fact stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyNamespace {
    /// `thing_key:<credential>` → thing id
    ThingKey,
    /// `channel:<channel id>` → set of thing ids
    Channel,
}

impl KeyNamespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::ThingKey => THING_KEY_PREFIX,
            Self::Channel => CHANNEL_PREFIX,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            THING_KEY_PREFIX => Some(Self::ThingKey),
            CHANNEL_PREFIX => Some(Self::Channel),
            _ => None,
        }
    }
}

/// A cache key that is scoped to a namespace.
///
/// The inner representation is private: a `NamespacedKey` can only be built
/// from a [`Credential`] or a [`ChannelId`], so a channel id can never be
/// looked up in the credential namespace by accident.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedKey {
    inner: KeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyInner {
    ThingKey(Credential),
    Channel(ChannelId),
}

impl NamespacedKey {
    /// Key of the credential → thing id mapping.
    pub fn thing_key(credential: &Credential) -> Self {
        Self {
            inner: KeyInner::ThingKey(credential.clone()),
        }
    }

    /// Key of the channel membership set.
    pub fn channel(channel_id: &ChannelId) -> Self {
        Self {
            inner: KeyInner::Channel(channel_id.clone()),
        }
    }

    pub fn namespace(&self) -> KeyNamespace {
        match self.inner {
            KeyInner::ThingKey(_) => KeyNamespace::ThingKey,
            KeyInner::Channel(_) => KeyNamespace::Channel,
        }
    }

    /// The key exactly as stored in the cache, e.g. `channel:7`.
    ///
    /// For thing keys this contains the raw credential; do not log it.
    pub fn encode(&self) -> String {
        let id = match &self.inner {
            KeyInner::ThingKey(credential) => credential.expose(),
            KeyInner::Channel(channel_id) => channel_id.as_str(),
        };
        let prefix = self.namespace().prefix();
        let mut key = String::with_capacity(prefix.len() + 1 + id.len());
        key.push_str(prefix);
        key.push(SEPARATOR);
        key.push_str(id);
        key
    }

    /// Parse a stored key back into its namespace and identifier.
    ///
    /// Returns `None` if:
    /// - The separator is missing
    /// - The prefix is not a known namespace
    /// - The identifier after the separator is empty
    pub fn decode(raw: &str) -> Option<Self> {
        let (prefix, id) = raw.split_once(SEPARATOR)?;
        let inner = match KeyNamespace::from_prefix(prefix)? {
            KeyNamespace::ThingKey => KeyInner::ThingKey(Credential::try_new(id).ok()?),
            KeyNamespace::Channel => KeyInner::Channel(ChannelId::try_new(id).ok()?),
        };
        Some(Self { inner })
    }
}

/// Log-safe rendering: thing keys show a credential fingerprint only.
impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            KeyInner::ThingKey(credential) => {
                write!(f, "{}{}{}", THING_KEY_PREFIX, SEPARATOR, credential.redacted())
            }
            KeyInner::Channel(channel_id) => {
                write!(f, "{}{}{}", CHANNEL_PREFIX, SEPARATOR, channel_id)
            }
        }
    }
}
