//! # Matrix Slice: range-resolved sub-region extraction
//!
//! A dataflow stage that copies a rectangular region out of an
//! n-dimensional matrix on every tick. Each dimension carries a
//! `(lower, upper)` pair that is interpreted either as absolute indices or
//! as a window centered on the axis, corrected when degenerate and clamped
//! into the input. An optional 1-D entry signal can drive the bounds of the
//! non-primary axes from whichever samples exceed a small threshold.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use matrix_slice::{AnchorMode, DimensionRange, Matrix, SliceStage, StageState};
//! use ndarray::Array2;
//!
//! let mut stage = SliceStage::new();
//! assert_eq!(stage.state(), StageState::Unconfigured);
//!
//! let input = Array2::from_shape_fn((20, 20), |(i, j)| (i * 20 + j) as u8);
//! stage.connect_matrix(Arc::new(Matrix::from(input.into_dyn())))?;
//!
//! // Edits in one batch produce a single change notification.
//! stage.update_config(|batch| {
//!     batch.set_anchor(AnchorMode::Center);
//!     batch.set_ranges(&[DimensionRange::new(0, 10), DimensionRange::new(0, 4)])
//! })?;
//!
//! let slice = stage.tick()?.expect("configured");
//! assert_eq!(slice.shape(), &[10, 4]);
//! # Ok::<(), matrix_slice::SliceError>(())
//! ```
//!
//! ## Core Concepts
//!
//! - **RangeConfig**: anchor mode plus one bound pair per dimension
//! - **RangeResolver**: bound pairs to valid half-open intervals
//! - **DimensionalityAdapter**: keeps the config length equal to the input's
//!   dimensionality, remembering bounds of dropped dimensions
//! - **EntryThresholdDetector**: dynamic bounds from an entry signal
//! - **SliceStage**: wiring, batching, notification and the per-tick copy

pub mod adapter;
pub mod allocator;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod limits;
pub mod matrix;
pub mod registry;
pub mod resolver;
pub mod stage;

// Re-exports for convenience
pub use adapter::{Adaptation, DimensionalityAdapter, ACCEPTED_DIMENSIONALITY};
pub use allocator::{Allocation, OutputAllocator};
pub use config::{AnchorMode, DimensionRange, RangeConfig, StageConfig};
pub use detector::{DynamicEntryState, EntryThresholdDetector, ENTRY_THRESHOLD};
pub use error::{Invariant, Result, SliceError};
pub use events::{ListenerId, Notifier, StageEvent};
pub use limits::LimitsCache;
pub use matrix::{Element, ElementType, Matrix};
pub use registry::{register_builtin, Registry, SlotDeclaration, StageDeclaration};
pub use resolver::{Interval, RangeResolver, ResolvedRanges};
pub use stage::{ConfigBatch, SliceStage, StageState, ENTRY_INPUT, MATRIX_INPUT, SLICE_OUTPUT};
