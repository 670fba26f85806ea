//! Limits cache: per-dimension memory of previously configured bounds.
//!
//! When an input loses dimensions and later regains them, the ranges that
//! were configured for the returning dimensions come back from here instead
//! of being reset to defaults.

use crate::config::{DimensionRange, RangeConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Last-known bounds keyed by dimension index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LimitsCache {
    entries: BTreeMap<usize, DimensionRange>,
}

impl LimitsCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached bounds of `dimension`, if any.
    pub fn get(&self, dimension: usize) -> Option<DimensionRange> {
        self.entries.get(&dimension).copied()
    }

    /// Remember `range` for `dimension`, replacing any earlier entry.
    pub fn insert(&mut self, dimension: usize, range: DimensionRange) {
        self.entries.insert(dimension, range);
    }

    /// Remember every dimension of `config` from index `from` onwards.
    pub fn remember(&mut self, config: &RangeConfig, from: usize) {
        for (dimension, range) in config.ranges().iter().enumerate().skip(from) {
            self.entries.insert(dimension, *range);
        }
    }

    /// Number of cached dimensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every cached dimension.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in ascending dimension order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, DimensionRange)> + '_ {
        self.entries.iter().map(|(&d, &r)| (d, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnchorMode;

    #[test]
    fn test_remember_from_index() {
        let config = RangeConfig::with_ranges(
            AnchorMode::Absolute,
            vec![
                DimensionRange::new(0, 1),
                DimensionRange::new(2, 3),
                DimensionRange::new(4, 5),
            ],
        );
        let mut cache = LimitsCache::new();
        cache.remember(&config, 1);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(0), None);
        assert_eq!(cache.get(2), Some(DimensionRange::new(4, 5)));
    }

    #[test]
    fn test_json_uses_index_keys() {
        let mut cache = LimitsCache::new();
        cache.insert(3, DimensionRange::new(1, 7));

        let json = serde_json::to_string(&cache).unwrap();
        assert_eq!(json, r#"{"3":{"lower":1,"upper":7}}"#);

        let restored: LimitsCache = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cache);
    }
}
