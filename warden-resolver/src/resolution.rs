//! Provenance of a resolved answer.

use warden_core::CacheError;

/// Where a [`Resolution`] was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionSource {
    /// Served from the cache store without contacting the authority.
    Cache,
    /// Answered by the remote authority after a cache miss.
    Authority,
}

impl ResolutionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Authority => "authority",
        }
    }
}

/// A resolved value tagged with its source.
///
/// When the authority answered because the cache lookup failed (rather than
/// simply missed), the absorbed cache error is kept in `cache_fault`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<T> {
    value: T,
    source: ResolutionSource,
    cache_fault: Option<CacheError>,
}

impl<T> Resolution<T> {
    /// A cache hit.
    pub fn from_cache(value: T) -> Self {
        Self {
            value,
            source: ResolutionSource::Cache,
            cache_fault: None,
        }
    }

    /// An authority answer, with the cache error that forced it if any.
    pub fn from_authority(value: T, cache_fault: Option<CacheError>) -> Self {
        Self {
            value,
            source: ResolutionSource::Authority,
            cache_fault,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn source(&self) -> ResolutionSource {
        self.source
    }

    pub fn was_cache_hit(&self) -> bool {
        self.source == ResolutionSource::Cache
    }

    /// Cache error absorbed on the way to the authority.
    pub fn cache_fault(&self) -> Option<&CacheError> {
        self.cache_fault.as_ref()
    }

    /// Transform the value, keeping provenance.
    pub fn map<U, F>(self, f: F) -> Resolution<U>
    where
        F: FnOnce(T) -> U,
    {
        Resolution {
            value: f(self.value),
            source: self.source,
            cache_fault: self.cache_fault,
        }
    }
}

impl<T> AsRef<T> for Resolution<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cache() {
        let resolution = Resolution::from_cache("thing-42");
        assert!(resolution.was_cache_hit());
        assert_eq!(resolution.source(), ResolutionSource::Cache);
        assert!(resolution.cache_fault().is_none());
        assert_eq!(resolution.into_value(), "thing-42");
    }

    #[test]
    fn test_from_authority_keeps_fault() {
        let fault = CacheError::Unavailable {
            reason: "down".to_string(),
        };
        let resolution = Resolution::from_authority(7, Some(fault.clone()));
        assert!(!resolution.was_cache_hit());
        assert_eq!(resolution.cache_fault(), Some(&fault));
        assert_eq!(*resolution.value(), 7);
    }

    #[test]
    fn test_map_preserves_provenance() {
        let resolution = Resolution::from_authority(2, None).map(|v| v * 21);
        assert_eq!(resolution.source().as_str(), "authority");
        assert_eq!(*resolution.as_ref(), 42);
    }
}
