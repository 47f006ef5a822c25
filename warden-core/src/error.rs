//! Error types for Warden operations

use thiserror::Error;

/// Argument validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Cache store errors.
///
/// The resolver never surfaces these to its callers: any of them is treated
/// as a cache miss and the request falls through to the remote authority.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache lookup on {key} timed out")]
    Timeout { key: String },

    #[error("Malformed cache entry at {key}: {reason}")]
    Malformed { key: String, reason: String },
}

/// Remote authority errors.
///
/// `UnknownCredential` and `Denied` are verdicts: the authority answered and
/// the answer was no. Everything else means the authority could not be asked
/// or could not answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("Credential is not known to the authority")]
    UnknownCredential,

    #[error("Access denied by authority: {reason}")]
    Denied { reason: String },

    #[error("Authority unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Authority call exceeded its deadline")]
    DeadlineExceeded,

    #[error("Authority call was cancelled")]
    Cancelled,

    #[error("Invalid response from authority: {reason}")]
    InvalidResponse { reason: String },

    #[error("Authority returned {code}: {message}")]
    Rpc { code: String, message: String },
}

impl AuthorityError {
    /// True when the authority explicitly answered "no".
    pub fn is_verdict(&self) -> bool {
        matches!(self, Self::UnknownCredential | Self::Denied { .. })
    }
}

/// Errors surfaced by `identify` and `authorize`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    #[error("identify failed for {key}: {source}")]
    IdentityResolution {
        key: String,
        #[source]
        source: AuthorityError,
    },

    #[error("authorize denied on {key} for thing {thing}: {reason}")]
    AuthorizationDenied {
        key: String,
        thing: String,
        reason: String,
    },

    #[error("authorize failed on {key} for thing {thing}: {source}")]
    Authorization {
        key: String,
        thing: String,
        #[source]
        source: AuthorityError,
    },

    #[error("{operation} cancelled by caller")]
    Cancelled { operation: &'static str },
}

impl AccessError {
    /// True for an explicit authorization denial.
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::AuthorizationDenied { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Underlying authority error, if the failure came from the authority.
    pub fn authority_error(&self) -> Option<&AuthorityError> {
        match self {
            Self::IdentityResolution { source, .. } | Self::Authorization { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or WARDEN_CONFIG)")]
    MissingConfigPath,

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Master error type for Warden bootstrap and tooling.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Authority error: {0}")]
    Authority(#[from] AuthorityError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Telemetry error: {reason}")]
    Telemetry { reason: String },
}

/// Result type alias for Warden bootstrap code.
pub type WardenResult<T> = Result<T, WardenError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_identity_resolution_keeps_source() {
        let err = AccessError::IdentityResolution {
            key: "thing_key:<credential sha256:abc>".to_string(),
            source: AuthorityError::UnknownCredential,
        };
        let msg = err.to_string();
        assert!(msg.contains("identify failed"));
        assert!(msg.contains("thing_key:"));
        assert!(err.source().is_some());
        assert_eq!(
            err.authority_error(),
            Some(&AuthorityError::UnknownCredential)
        );
    }

    #[test]
    fn test_denied_and_error_are_distinct() {
        let denied = AccessError::AuthorizationDenied {
            key: "channel:7".to_string(),
            thing: "thing-1".to_string(),
            reason: "not connected".to_string(),
        };
        let failed = AccessError::Authorization {
            key: "channel:7".to_string(),
            thing: "thing-1".to_string(),
            source: AuthorityError::Unavailable {
                reason: "connection refused".to_string(),
            },
        };
        assert!(denied.is_denied());
        assert!(!failed.is_denied());
        assert!(denied.authority_error().is_none());
        assert!(failed.authority_error().is_some());
    }

    #[test]
    fn test_authority_verdicts() {
        assert!(AuthorityError::UnknownCredential.is_verdict());
        assert!(AuthorityError::Denied {
            reason: String::new()
        }
        .is_verdict());
        assert!(!AuthorityError::DeadlineExceeded.is_verdict());
        assert!(!AuthorityError::Cancelled.is_verdict());
    }

    #[test]
    fn test_master_error_from_conversions() {
        let err: WardenError = ValidationError::Empty { field: "thing_id" }.into();
        assert!(matches!(err, WardenError::Validation(_)));

        let err: WardenError = AccessError::Cancelled {
            operation: "identify",
        }
        .into();
        assert!(err.to_string().contains("identify cancelled"));
    }
}
