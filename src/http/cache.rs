//! Cache-Control values for asset and probe responses

/// Caching the server asks browsers to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Browser-only caching for `max_age` seconds; shared caches must not store
    Private(u32),
    /// Never store: health probes must always reach the server
    NoStore,
}

impl CachePolicy {
    pub fn to_header_value(self) -> String {
        match self {
            Self::Private(max_age) => format!("private, max-age={max_age}"),
            Self::NoStore => "no-store".to_string(),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::Private(3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_values() {
        assert_eq!(
            CachePolicy::Private(600).to_header_value(),
            "private, max-age=600"
        );
        assert_eq!(CachePolicy::NoStore.to_header_value(), "no-store");
        assert_eq!(
            CachePolicy::default().to_header_value(),
            "private, max-age=3600"
        );
    }
}
