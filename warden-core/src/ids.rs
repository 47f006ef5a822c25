//! Identifier types for things, channels and thing credentials.
//!
//! All three are opaque strings as far as Warden is concerned. The newtypes
//! exist so a channel id can never be passed where a thing id is expected,
//! and so credentials never leak into logs through `Debug`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::ValidationError;

/// Number of hex characters shown by [`Credential::fingerprint`].
const FINGERPRINT_LEN: usize = 12;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier, rejecting the empty string.
            pub fn try_new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(ValidationError::Empty { field: $field });
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::try_new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::try_new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

opaque_id!(
    /// Stable identifier of a thing (device or application).
    ThingId,
    "thing_id"
);

opaque_id!(
    /// Identifier of a channel that things can be connected to.
    ChannelId,
    "channel_id"
);

/// Secret key a thing presents to prove its identity.
///
/// `Debug` and `Display` print a redacted fingerprint instead of the key, so a
/// credential can be carried through error values and tracing fields safely.
/// Use [`Credential::expose`] where the raw value is genuinely required
/// (cache key construction, the outbound authority request).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw thing key, rejecting the empty string.
    pub fn try_new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty { field: "credential" });
        }
        Ok(Self(value))
    }

    /// The raw key.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 fingerprint, stable across processes.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(FINGERPRINT_LEN);
        hex
    }

    /// Redacted rendering used in logs and error messages.
    pub fn redacted(&self) -> String {
        format!("<credential sha256:{}>", self.fingerprint())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.fingerprint()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl TryFrom<&str> for Credential {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ids_are_rejected() {
        assert_eq!(
            ThingId::try_new(""),
            Err(ValidationError::Empty { field: "thing_id" })
        );
        assert_eq!(
            ChannelId::try_new(""),
            Err(ValidationError::Empty { field: "channel_id" })
        );
        assert_eq!(
            Credential::try_new("").map(|_| ()),
            Err(ValidationError::Empty { field: "credential" })
        );
    }

    #[test]
    fn test_credential_is_redacted() {
        let credential = Credential::try_new("super-secret-key").unwrap();
        let debug = format!("{:?}", credential);
        let display = credential.to_string();

        assert!(!debug.contains("super-secret-key"));
        assert!(!display.contains("super-secret-key"));
        assert!(display.contains(&credential.fingerprint()));
        assert_eq!(credential.fingerprint().len(), FINGERPRINT_LEN);
        assert_eq!(credential.expose(), "super-secret-key");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Credential::try_new("abc123").unwrap();
        let b = Credential::try_new("abc123").unwrap();
        let c = Credential::try_new("abc124").unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_id_serde_rejects_empty() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            thing: ThingId,
        }

        let ok: Wrapper = toml::from_str("thing = \"thing-42\"").unwrap();
        assert_eq!(ok.thing.as_str(), "thing-42");

        let err = toml::from_str::<Wrapper>("thing = \"\"");
        assert!(err.is_err());
    }
}
