//! Response cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_INDEX_TTL_SECONDS: u64 = 20;
const DEFAULT_MAX_ENTRIES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Serve cached index responses at all.
    pub enabled: bool,
    /// How long a stored index response stays fresh.
    pub index_ttl: Duration,
    /// Upper bound on stored responses; least recently used go first.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index_ttl: Duration::from_secs(DEFAULT_INDEX_TTL_SECONDS),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            index_ttl: Duration::from_secs(settings.index_ttl_seconds.get()),
            max_entries: settings.max_entries.get(),
        }
    }
}

impl CacheConfig {
    /// Capacity as `NonZeroUsize`, clamping zero to one.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.index_ttl, Duration::from_secs(20));
        assert_eq!(config.max_entries, 64);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert_eq!(config.max_entries_non_zero().get(), 1);
    }
}
