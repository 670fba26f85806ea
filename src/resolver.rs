//! Range resolution: configured bounds to concrete per-axis intervals.
//!
//! # Steps, per axis
//!
//! 1. Pick the raw pair. The primary axis always reads the configuration;
//!    the other axes read the detector's dynamic pair while an entry signal
//!    is wired, and the configuration otherwise.
//! 2. Apply the anchor mode. In [`AnchorMode::Center`] `upper` is a window
//!    size centered on the axis and `lower` shifts the window's start.
//! 3. Fix degenerate pairs: swap reversed bounds, widen zero-width ones by a
//!    single index.
//! 4. Clamp into the axis.
//!
//! The result always satisfies `0 <= start < end <= dim_size`.
//!
//! # Dimensionality 0 and 1
//!
//! Row and column vectors are resolved as two-axis problems. The vector's
//! long axis is sliced with the first configured range; the unit axis keeps
//! its full extent.

use crate::config::{AnchorMode, DimensionRange, RangeConfig};
use crate::detector::DynamicEntryState;
use crate::error::{Invariant, Result};
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// A half-open interval `[start, end)` on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    /// The interval `[start, end)`.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The whole of an axis of length `size`.
    pub const fn full(size: usize) -> Self {
        Self::new(0, size)
    }

    /// Number of indices covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One resolved interval per addressed input axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRanges {
    intervals: Vec<Interval>,
}

impl ResolvedRanges {
    /// Get the intervals, one per addressed axis.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Interval of one axis.
    pub fn get(&self, axis: usize) -> Option<Interval> {
        self.intervals.get(axis).copied()
    }

    /// Output shape: the length of every interval.
    pub fn sizes(&self) -> Vec<usize> {
        self.intervals.iter().map(Interval::len).collect()
    }

    /// Number of resolved axes.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// Resolves a [`RangeConfig`] against an input.
pub struct RangeResolver;

impl RangeResolver {
    /// Resolve every addressed axis of `input`.
    ///
    /// `dynamic` is the detector's pair when an entry signal is wired. It is
    /// shared by all non-primary axes.
    pub fn resolve(
        config: &RangeConfig,
        dynamic: Option<&DynamicEntryState>,
        input: &Matrix,
    ) -> Result<ResolvedRanges> {
        let dimensionality = input.dimensionality();
        crate::invariant!(
            config.len() == dimensionality,
            Invariant::RangeCountMismatch {
                expected: dimensionality,
                got: config.len(),
            }
        );

        let shape = input.addressed_shape();
        let anchor = config.anchor();

        let intervals = if dimensionality > 1 {
            shape
                .iter()
                .enumerate()
                .map(|(axis, &dim_size)| {
                    let (lower, upper) = Self::raw_bounds(config, dynamic, axis)?;
                    Self::resolve_axis(lower, upper, dim_size, anchor, axis)
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            let (slice_axis, unit_axis) = if shape[0] == 1 { (1, 0) } else { (0, 1) };
            let (lower, upper) = Self::raw_bounds(config, dynamic, 0)?;
            let mut intervals = vec![Interval::full(0); 2];
            intervals[slice_axis] =
                Self::resolve_axis(lower, upper, shape[slice_axis], anchor, slice_axis)?;
            intervals[unit_axis] = Interval::full(shape[unit_axis]);
            intervals
        };

        Ok(ResolvedRanges { intervals })
    }

    fn raw_bounds(
        config: &RangeConfig,
        dynamic: Option<&DynamicEntryState>,
        dimension: usize,
    ) -> Result<(i64, i64)> {
        match dynamic {
            Some(state) if dimension > 0 => Ok((to_signed(state.lower), to_signed(state.upper))),
            _ => {
                let DimensionRange { lower, upper } = config.range(dimension)?;
                Ok((i64::from(lower), i64::from(upper)))
            }
        }
    }

    /// Resolve a single axis of length `dim_size`.
    ///
    /// `axis` is only used to report a zero-size dimension.
    pub fn resolve_axis(
        lower: i64,
        upper: i64,
        dim_size: usize,
        anchor: AnchorMode,
        axis: usize,
    ) -> Result<Interval> {
        crate::invariant!(dim_size > 0, Invariant::ZeroSizeDimension { axis });
        let dim = to_signed(dim_size);
        let (mut lower, mut upper) = (lower, upper);

        match anchor {
            AnchorMode::Absolute => {}
            AnchorMode::Center => {
                // `upper - width` rather than `width` keeps odd window sizes whole
                let width = upper / 2;
                lower = dim / 2 - (upper - width) + lower;
                upper = dim / 2 + width;
            }
        }

        if lower > upper {
            std::mem::swap(&mut lower, &mut upper);
        } else if lower == upper {
            if upper < dim - 1 || lower == 0 {
                upper += 1;
            } else {
                lower -= 1;
            }
        }

        let start = lower.clamp(0, dim - 1);
        let mut end = upper.clamp(0, dim);
        // a window lying entirely below zero collapses onto the first index
        if end <= start {
            end = start + 1;
        }

        if (start, end) != (lower, upper) {
            trace!(axis, lower, upper, start, end, "clamped range into axis");
        }

        Ok(Interval::new(to_unsigned(start), to_unsigned(end)))
    }
}

fn to_signed(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_unsigned(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
