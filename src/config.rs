//! Range configuration: anchor mode plus per-dimension bounds.
//!
//! [`RangeConfig`] is the live, in-memory configuration of a stage.
//! [`StageConfig`] is its persisted form, laid out the way the host's
//! parameter store sees it (`anchor_type`, `range_lower`, `range_upper`)
//! together with the cached per-dimension limits.

use crate::error::{Invariant, Result};
use crate::limits::LimitsCache;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lower bound given to dimensions that have never been configured.
pub const DEFAULT_LOWER: u32 = 10;

/// Upper bound given to dimensions that have never been configured.
pub const DEFAULT_UPPER: u32 = 15;

/// Number of dimensions configured before any input arrives.
pub const DEFAULT_DIMENSIONS: usize = 2;

/// How a (lower, upper) pair maps onto an axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    /// `lower` and `upper` are absolute indices.
    #[default]
    Absolute,

    /// `upper` is a window size centered on the axis, `lower` an offset
    /// from the window's start.
    Center,
}

/// Configured bounds for one dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionRange {
    pub lower: u32,
    pub upper: u32,
}

impl DimensionRange {
    /// Bounds for one dimension.
    pub const fn new(lower: u32, upper: u32) -> Self {
        Self { lower, upper }
    }
}

impl Default for DimensionRange {
    fn default() -> Self {
        Self::new(DEFAULT_LOWER, DEFAULT_UPPER)
    }
}

/// Anchor mode and one [`DimensionRange`] per input dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeConfig {
    anchor: AnchorMode,
    ranges: Vec<DimensionRange>,
}

impl RangeConfig {
    /// Absolute anchoring over [`DEFAULT_DIMENSIONS`] default ranges.
    pub fn new() -> Self {
        Self::with_ranges(
            AnchorMode::Absolute,
            vec![DimensionRange::default(); DEFAULT_DIMENSIONS],
        )
    }

    /// A configuration with explicit ranges.
    pub fn with_ranges(anchor: AnchorMode, ranges: Vec<DimensionRange>) -> Self {
        Self { anchor, ranges }
    }

    /// Get the anchor mode.
    pub fn anchor(&self) -> AnchorMode {
        self.anchor
    }

    /// Set the anchor mode.
    pub fn set_anchor(&mut self, anchor: AnchorMode) {
        self.anchor = anchor;
    }

    /// Number of configured dimensions.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether no dimension is configured.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Get all configured ranges, in dimension order.
    pub fn ranges(&self) -> &[DimensionRange] {
        &self.ranges
    }

    /// Bounds of dimension `dimension`.
    pub fn range(&self, dimension: usize) -> Result<DimensionRange> {
        crate::invariant!(
            dimension < self.ranges.len(),
            Invariant::DimensionOutOfBounds {
                dimension,
                len: self.ranges.len(),
            }
        );
        Ok(self.ranges[dimension])
    }

    /// Overwrite the bounds of dimension `dimension`.
    pub fn set_range(&mut self, dimension: usize, range: DimensionRange) -> Result<()> {
        crate::invariant!(
            dimension < self.ranges.len(),
            Invariant::DimensionOutOfBounds {
                dimension,
                len: self.ranges.len(),
            }
        );
        self.ranges[dimension] = range;
        Ok(())
    }

    /// Overwrite every dimension at once; the length must not change.
    pub fn set_ranges(&mut self, ranges: &[DimensionRange]) -> Result<()> {
        crate::invariant!(
            ranges.len() == self.ranges.len(),
            Invariant::RangeCountMismatch {
                expected: self.ranges.len(),
                got: ranges.len(),
            }
        );
        self.ranges.copy_from_slice(ranges);
        Ok(())
    }

    /// Overwrite only the lower bounds.
    pub fn set_lower_values(&mut self, lower: &[u32]) -> Result<()> {
        crate::invariant!(
            lower.len() == self.ranges.len(),
            Invariant::RangeCountMismatch {
                expected: self.ranges.len(),
                got: lower.len(),
            }
        );
        for (range, &value) in self.ranges.iter_mut().zip(lower) {
            range.lower = value;
        }
        Ok(())
    }

    /// Overwrite only the upper bounds.
    pub fn set_upper_values(&mut self, upper: &[u32]) -> Result<()> {
        crate::invariant!(
            upper.len() == self.ranges.len(),
            Invariant::RangeCountMismatch {
                expected: self.ranges.len(),
                got: upper.len(),
            }
        );
        for (range, &value) in self.ranges.iter_mut().zip(upper) {
            range.upper = value;
        }
        Ok(())
    }

    /// Lower bounds in dimension order.
    pub fn lower_values(&self) -> Vec<u32> {
        self.ranges.iter().map(|r| r.lower).collect()
    }

    /// Upper bounds in dimension order.
    pub fn upper_values(&self) -> Vec<u32> {
        self.ranges.iter().map(|r| r.upper).collect()
    }

    /// Grow with default ranges or truncate; existing indices are untouched.
    pub(crate) fn resize(&mut self, len: usize) {
        self.ranges.resize(len, DimensionRange::default());
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted stage configuration.
///
/// `range_lower` and `range_upper` are stored independently, as the host's
/// parameter store keeps them. When they disagree in length only the common
/// prefix is used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(default)]
    pub anchor_type: AnchorMode,
    pub range_lower: Vec<u32>,
    pub range_upper: Vec<u32>,
    /// Cached limits of dimensions not currently configured.
    #[serde(default)]
    pub limits: LimitsCache,
}

impl StageConfig {
    /// Capture a live configuration and its limits cache.
    pub fn capture(config: &RangeConfig, limits: &LimitsCache) -> Self {
        Self {
            anchor_type: config.anchor(),
            range_lower: config.lower_values(),
            range_upper: config.upper_values(),
            limits: limits.clone(),
        }
    }

    /// Rebuild the live configuration, pairing lower/upper by index.
    pub fn range_config(&self) -> RangeConfig {
        let ranges = self
            .range_lower
            .iter()
            .zip(&self.range_upper)
            .map(|(&lower, &upper)| DimensionRange::new(lower, upper))
            .collect();
        RangeConfig::with_ranges(self.anchor_type, ranges)
    }

    /// Save to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::capture(&RangeConfig::new(), &LimitsCache::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RangeConfig::new();
        assert_eq!(config.anchor(), AnchorMode::Absolute);
        assert_eq!(config.len(), 2);
        assert_eq!(config.lower_values(), vec![10, 10]);
        assert_eq!(config.upper_values(), vec![15, 15]);
    }

    #[test]
    fn test_set_ranges() {
        let mut config = RangeConfig::new();
        config
            .set_ranges(&[DimensionRange::new(1, 2), DimensionRange::new(3, 4)])
            .unwrap();
        assert_eq!(config.range(1).unwrap(), DimensionRange::new(3, 4));

        config.set_upper_values(&[7, 8]).unwrap();
        assert_eq!(config.ranges(), &[DimensionRange::new(1, 7), DimensionRange::new(3, 8)]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "range sequence length mismatch")]
    fn test_set_ranges_length_mismatch() {
        let mut config = RangeConfig::new();
        let _ = config.set_ranges(&[DimensionRange::new(1, 2)]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of bounds")]
    fn test_range_out_of_bounds() {
        let config = RangeConfig::new();
        let _ = config.range(5);
    }

    #[test]
    fn test_resize_keeps_prefix() {
        let mut config = RangeConfig::new();
        config.set_range(0, DimensionRange::new(0, 1)).unwrap();
        config.resize(3);
        assert_eq!(config.range(0).unwrap(), DimensionRange::new(0, 1));
        assert_eq!(config.range(2).unwrap(), DimensionRange::default());
        config.resize(1);
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_anchor_serialized_lowercase() {
        let json = serde_json::to_string(&AnchorMode::Center).unwrap();
        assert_eq!(json, "\"center\"");
    }

    #[test]
    fn test_stage_config_uses_common_prefix() {
        let stored = StageConfig {
            anchor_type: AnchorMode::Center,
            range_lower: vec![1, 2, 3],
            range_upper: vec![4, 5],
            limits: LimitsCache::new(),
        };
        let config = stored.range_config();
        assert_eq!(config.anchor(), AnchorMode::Center);
        assert_eq!(config.ranges(), &[DimensionRange::new(1, 4), DimensionRange::new(2, 5)]);
    }

    #[test]
    fn test_stage_config_missing_fields_default() {
        let stored: StageConfig =
            serde_json::from_str(r#"{"range_lower": [2], "range_upper": [9]}"#).unwrap();
        assert_eq!(stored.anchor_type, AnchorMode::Absolute);
        assert!(stored.limits.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut config = RangeConfig::new();
        config.set_anchor(AnchorMode::Center);
        let mut limits = LimitsCache::new();
        limits.insert(4, DimensionRange::new(6, 9));
        let stored = StageConfig::capture(&config, &limits);

        let path = std::env::temp_dir().join("matrix_slice_test_stage_config.json");
        stored.save(&path).expect("save failed");
        let loaded = StageConfig::load(&path).expect("load failed");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, stored);
    }
}
