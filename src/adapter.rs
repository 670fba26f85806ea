//! Dimensionality adapter: keeps the configured range count in step with
//! the input.

use crate::config::RangeConfig;
use crate::error::{Invariant, Result};
use crate::limits::LimitsCache;
use std::ops::RangeInclusive;
use tracing::debug;

/// Dimensionalities the primary input may have.
pub const ACCEPTED_DIMENSIONALITY: RangeInclusive<usize> = 1..=16;

/// What a single adapter pass did to the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adaptation {
    pub old_len: usize,
    pub new_len: usize,
    /// New dimensions filled from the limits cache rather than defaults.
    pub restored: usize,
}

impl Adaptation {
    /// Whether the configured dimension count changed.
    pub fn changed(&self) -> bool {
        self.old_len != self.new_len
    }
}

/// Resizes a [`RangeConfig`] to an input's dimensionality.
pub struct DimensionalityAdapter;

impl DimensionalityAdapter {
    /// Resize `config` to `dimensionality` entries.
    ///
    /// Existing indices keep their values. Dimensions dropped by a shrink are
    /// written to `cache`; dimensions added by a growth are read back from it,
    /// falling back to the defaults.
    pub fn adapt(
        config: &mut RangeConfig,
        cache: &mut LimitsCache,
        dimensionality: usize,
    ) -> Result<Adaptation> {
        crate::invariant!(
            ACCEPTED_DIMENSIONALITY.contains(&dimensionality),
            Invariant::UnsupportedDimensionality { dimensionality }
        );

        let old_len = config.len();
        if dimensionality < old_len {
            cache.remember(config, dimensionality);
        }
        config.resize(dimensionality);

        let mut restored = 0;
        for dimension in old_len..dimensionality {
            if let Some(range) = cache.get(dimension) {
                config.set_range(dimension, range)?;
                restored += 1;
            }
        }

        let adaptation = Adaptation {
            old_len,
            new_len: dimensionality,
            restored,
        };
        if adaptation.changed() {
            debug!(old_len, new_len = dimensionality, restored, "adapted range dimensionality");
        }
        Ok(adaptation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnchorMode, DimensionRange};

    fn config_of(ranges: &[(u32, u32)]) -> RangeConfig {
        RangeConfig::with_ranges(
            AnchorMode::Absolute,
            ranges.iter().map(|&(l, u)| DimensionRange::new(l, u)).collect(),
        )
    }

    #[test]
    fn test_grow_uses_defaults() {
        let mut config = config_of(&[(1, 2)]);
        let mut cache = LimitsCache::new();

        let adaptation = DimensionalityAdapter::adapt(&mut config, &mut cache, 3).unwrap();

        assert!(adaptation.changed());
        assert_eq!(adaptation.restored, 0);
        assert_eq!(config.range(0).unwrap(), DimensionRange::new(1, 2));
        assert_eq!(config.range(1).unwrap(), DimensionRange::new(10, 15));
        assert_eq!(config.range(2).unwrap(), DimensionRange::new(10, 15));
    }

    #[test]
    fn test_shrink_then_grow_restores() {
        let mut config = config_of(&[(1, 2), (3, 4), (5, 6)]);
        let mut cache = LimitsCache::new();

        DimensionalityAdapter::adapt(&mut config, &mut cache, 1).unwrap();
        assert_eq!(config.len(), 1);

        let adaptation = DimensionalityAdapter::adapt(&mut config, &mut cache, 3).unwrap();
        assert_eq!(adaptation.restored, 2);
        assert_eq!(config, config_of(&[(1, 2), (3, 4), (5, 6)]));
    }

    #[test]
    fn test_cache_preferred_over_defaults() {
        let mut config = config_of(&[(0, 1)]);
        let mut cache = LimitsCache::new();
        cache.insert(1, DimensionRange::new(7, 8));

        DimensionalityAdapter::adapt(&mut config, &mut cache, 3).unwrap();

        assert_eq!(config.range(1).unwrap(), DimensionRange::new(7, 8));
        assert_eq!(config.range(2).unwrap(), DimensionRange::default());
    }

    #[test]
    fn test_same_length_is_noop() {
        let mut config = config_of(&[(1, 2), (3, 4)]);
        let mut cache = LimitsCache::new();

        let adaptation = DimensionalityAdapter::adapt(&mut config, &mut cache, 2).unwrap();

        assert!(!adaptation.changed());
        assert!(cache.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invariant violated")]
    fn test_rejects_unsupported_dimensionality() {
        let mut config = RangeConfig::new();
        let mut cache = LimitsCache::new();
        let _ = DimensionalityAdapter::adapt(&mut config, &mut cache, 17);
    }
}
