//! Error types for matrix slicing.
//!
//! Two kinds of failure live here. [`SliceError::Invariant`] wraps a broken
//! precondition of the surrounding pipeline (see [`Invariant`]); these abort
//! debug and test builds through [`invariant!`](crate::invariant) and are
//! only returned as values in release builds. Everything else is an ordinary
//! recoverable error.

use crate::matrix::ElementType;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Preconditions whose violation indicates an integration bug, not bad data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Invariant {
    /// A per-dimension accessor was called past the configured length.
    #[error("dimension {dimension} out of bounds for {len} configured ranges")]
    DimensionOutOfBounds { dimension: usize, len: usize },

    /// The adapter was asked for a dimensionality the stage cannot hold.
    #[error("unsupported dimensionality {dimensionality}")]
    UnsupportedDimensionality { dimensionality: usize },

    /// A batch of ranges did not match the configured dimension count.
    #[error("range sequence length mismatch: expected {expected}, got {got}")]
    RangeCountMismatch { expected: usize, got: usize },

    /// Resolved ranges no longer match the rank of the input being sliced.
    #[error("resolved {resolved} ranges for an input of rank {rank}")]
    ResolvedCountMismatch { resolved: usize, rank: usize },

    /// An output buffer does not hold the input's element type.
    #[error("element type mismatch: expected {expected}, got {got}")]
    ElementTypeMismatch { expected: ElementType, got: ElementType },

    /// A copy interval is empty or runs past its axis.
    #[error("interval [{start}, {end}) on axis {axis} outside size {size}")]
    IntervalOutOfBounds {
        axis: usize,
        start: usize,
        end: usize,
        size: usize,
    },

    /// An output buffer does not have the shape of the copied region.
    #[error("region shape {expected:?} does not match output shape {got:?}")]
    RegionShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// Degenerate correction underflowed, only possible on an empty axis.
    #[error("axis {axis} has size zero")]
    ZeroSizeDimension { axis: usize },
}

/// Matrix slice error types.
#[derive(Error, Debug)]
pub enum SliceError {
    /// Broken pipeline precondition (release builds only; debug builds panic)
    #[error("invariant violated: {0}")]
    Invariant(#[from] Invariant),

    /// Input rejected by the slot's dimensionality check
    #[error("input `{slot}` has dimensionality {dimensionality}, accepted {accepted:?}")]
    IncompatibleInput {
        slot: String,
        dimensionality: usize,
        accepted: RangeInclusive<usize>,
    },

    /// Input name that the stage does not declare
    #[error("unknown input slot: {0}")]
    UnknownSlot(String),

    /// Configuration file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or produced
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for matrix slice operations.
pub type Result<T> = std::result::Result<T, SliceError>;

/// Checks a pipeline precondition.
///
/// Panics when `debug_assertions` are on, otherwise returns the violation as
/// [`SliceError::Invariant`] from the enclosing function.
#[macro_export]
macro_rules! invariant {
    ($cond:expr, $violation:expr) => {
        if !$cond {
            let violation: $crate::error::Invariant = $violation;
            if cfg!(debug_assertions) {
                panic!("invariant violated: {}", violation);
            }
            return Err($crate::error::SliceError::Invariant(violation));
        }
    };
}
