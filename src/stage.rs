//! The slice stage: wiring, configuration batches and the per-tick copy.
//!
//! A [`SliceStage`] starts [`StageState::Unconfigured`]. The first valid
//! `matrix` input adapts the configuration to its dimensionality, resolves
//! the ranges and allocates the output, after which the stage is
//! [`StageState::Configured`] and every [`tick`](SliceStage::tick) produces a
//! fresh deep copy of the addressed region.
//!
//! When an `entry` signal is wired, each tick first runs the threshold
//! detector and re-resolves; without one, ticks reuse the resolved ranges.

use crate::adapter::{DimensionalityAdapter, ACCEPTED_DIMENSIONALITY};
use crate::allocator::{Allocation, OutputAllocator};
use crate::config::{AnchorMode, DimensionRange, RangeConfig, StageConfig};
use crate::detector::{DynamicEntryState, EntryThresholdDetector};
use crate::error::{Invariant, Result, SliceError};
use crate::events::{ListenerId, Notifier, StageEvent};
use crate::limits::LimitsCache;
use crate::matrix::Matrix;
use crate::registry::SlotDeclaration;
use crate::resolver::{RangeResolver, ResolvedRanges};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Name of the required input slot.
pub const MATRIX_INPUT: &str = "matrix";

/// Name of the optional entry-signal slot.
pub const ENTRY_INPUT: &str = "entry";

/// Name of the output slot.
pub const SLICE_OUTPUT: &str = "slice";

/// Dimensionalities the entry signal may have.
pub const ENTRY_DIMENSIONALITY: RangeInclusive<usize> = 0..=1;

/// Lifecycle of a [`SliceStage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageState {
    /// No valid input yet; ticks produce nothing.
    Unconfigured,
    /// Ranges are resolved and the output is allocated.
    Configured,
}

/// Extracts a sub-region of an n-dimensional matrix.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use matrix_slice::{DimensionRange, Matrix, SliceStage};
/// use ndarray::Array2;
///
/// let input = Array2::from_shape_fn((20, 30), |(i, j)| (i * 100 + j) as f32);
/// let mut stage = SliceStage::new();
/// stage.connect_matrix(Arc::new(Matrix::from(input.into_dyn())))?;
/// stage.set_ranges(&[DimensionRange::new(2, 10), DimensionRange::new(5, 25)])?;
///
/// let slice = stage.tick()?.expect("configured");
/// assert_eq!(slice.shape(), &[8, 20]);
/// # Ok::<(), matrix_slice::SliceError>(())
/// ```
#[derive(Debug)]
pub struct SliceStage {
    config: RangeConfig,
    limits: LimitsCache,
    detector: EntryThresholdDetector,
    matrix: Option<Arc<Matrix>>,
    entry: Option<Arc<Matrix>>,
    resolved: Option<ResolvedRanges>,
    allocator: OutputAllocator,
    notifier: Notifier,
    state: StageState,
}

impl SliceStage {
    /// A stage with default configuration and nothing wired.
    pub fn new() -> Self {
        Self {
            config: RangeConfig::new(),
            limits: LimitsCache::new(),
            detector: EntryThresholdDetector::new(),
            matrix: None,
            entry: None,
            resolved: None,
            allocator: OutputAllocator::new(),
            notifier: Notifier::new(),
            state: StageState::Unconfigured,
        }
    }

    /// A stage restored from persisted configuration.
    pub fn from_config(stored: StageConfig) -> Self {
        let mut stage = Self::new();
        stage.load_config(stored);
        stage
    }

    /// Replace the detector, e.g. to use a different threshold.
    pub fn with_detector(mut self, detector: EntryThresholdDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Declaration of the `matrix` slot.
    pub fn matrix_slot() -> SlotDeclaration {
        SlotDeclaration::new(MATRIX_INPUT, true, ACCEPTED_DIMENSIONALITY)
    }

    /// Declaration of the `entry` slot.
    pub fn entry_slot() -> SlotDeclaration {
        SlotDeclaration::new(ENTRY_INPUT, false, ENTRY_DIMENSIONALITY)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the lifecycle state.
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Get the live range configuration.
    pub fn config(&self) -> &RangeConfig {
        &self.config
    }

    /// Get the limits cache.
    pub fn limits(&self) -> &LimitsCache {
        &self.limits
    }

    /// Configured bounds of one dimension.
    pub fn range(&self, dimension: usize) -> Result<DimensionRange> {
        self.config.range(dimension)
    }

    /// Ranges used by the most recent resolution, if configured.
    pub fn resolved_ranges(&self) -> Option<&ResolvedRanges> {
        self.resolved.as_ref()
    }

    /// The most recently produced slice.
    pub fn output(&self) -> Option<&Matrix> {
        self.allocator.output()
    }

    /// Get the output allocator.
    pub fn allocator(&self) -> &OutputAllocator {
        &self.allocator
    }

    /// Get the pair last found by the entry detector.
    pub fn entry_state(&self) -> &DynamicEntryState {
        self.detector.state()
    }

    /// Forget the dynamic pair found by the entry detector.
    pub fn reset_entry_state(&mut self) {
        self.detector.reset();
    }

    /// Whether an entry signal is connected.
    pub fn is_entry_wired(&self) -> bool {
        self.entry.is_some()
    }

    /// Register a change listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&StageEvent) + 'static) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    /// Remove a change listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Host entry point for connection changes, dispatched by slot name.
    pub fn input_connection_changed(
        &mut self,
        name: &str,
        data: Option<Arc<Matrix>>,
    ) -> Result<()> {
        match (name, data) {
            (MATRIX_INPUT, Some(matrix)) => self.connect_matrix(matrix),
            (MATRIX_INPUT, None) => {
                self.disconnect_matrix();
                Ok(())
            }
            (ENTRY_INPUT, Some(entry)) => self.connect_entry(entry),
            (ENTRY_INPUT, None) => self.disconnect_entry(),
            (other, _) => Err(SliceError::UnknownSlot(other.to_string())),
        }
    }

    /// Wire the primary input and adapt to its dimensionality.
    ///
    /// An input outside the accepted dimensionality is rejected and leaves
    /// the slot empty.
    pub fn connect_matrix(&mut self, matrix: Arc<Matrix>) -> Result<()> {
        if let Err(err) = Self::matrix_slot().check(&matrix) {
            warn!(%err, "rejected matrix input");
            self.disconnect_matrix();
            return Err(err);
        }
        debug!(input = %matrix, "matrix connected");
        self.matrix = Some(matrix);
        self.update_dimensionality()
    }

    /// Unwire the primary input. The last slice stays readable.
    pub fn disconnect_matrix(&mut self) {
        self.matrix = None;
        self.unconfigure();
    }

    /// Wire the entry signal. Its effect shows from the next tick on.
    pub fn connect_entry(&mut self, entry: Arc<Matrix>) -> Result<()> {
        if let Err(err) = Self::entry_slot().check(&entry) {
            warn!(%err, "rejected entry input");
            self.disconnect_entry()?;
            return Err(err);
        }
        debug!(input = %entry, "entry connected");
        self.entry = Some(entry);
        Ok(())
    }

    /// Unwire the entry signal; all axes go back to the configured ranges.
    pub fn disconnect_entry(&mut self) -> Result<()> {
        if self.entry.take().is_some() && self.state == StageState::Configured {
            self.refresh()?;
        }
        Ok(())
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Apply a batch of configuration edits atomically.
    ///
    /// Listeners see a single [`StageEvent::ConfigurationChanged`] after the
    /// batch, then the stage re-resolves once and, if configured, ticks.
    /// If `edit` fails, the configuration is rolled back and nothing is
    /// announced.
    pub fn update_config<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut ConfigBatch<'_>) -> Result<()>,
    {
        let previous = self.config.clone();
        self.notifier.suspend();
        let mut batch = ConfigBatch {
            config: &mut self.config,
            notifier: &mut self.notifier,
            changed: false,
        };
        let outcome = edit(&mut batch);
        let changed = batch.changed;

        if let Err(err) = outcome {
            debug!(%err, "configuration batch rolled back");
            self.config = previous;
            self.notifier.discard_pending();
            self.notifier.resume();
            return Err(err);
        }
        self.notifier.resume();

        if changed {
            self.range_changed()?;
        }
        Ok(())
    }

    /// Change the anchor mode.
    pub fn set_anchor(&mut self, anchor: AnchorMode) -> Result<()> {
        self.update_config(|batch| {
            batch.set_anchor(anchor);
            Ok(())
        })
    }

    /// Replace every configured range; the count must match.
    pub fn set_ranges(&mut self, ranges: &[DimensionRange]) -> Result<()> {
        self.update_config(|batch| batch.set_ranges(ranges))
    }

    /// Persisted form of the current configuration.
    pub fn snapshot(&self) -> StageConfig {
        StageConfig::capture(&self.config, &self.limits)
    }

    /// Replace the configuration with a persisted one.
    ///
    /// The limits cache is restored first, so a connected input immediately
    /// picks up cached bounds for any dimensions it adds.
    pub fn restore(&mut self, stored: StageConfig) -> Result<()> {
        self.load_config(stored);
        self.notifier.notify(StageEvent::ConfigurationChanged);
        self.update_dimensionality()
    }

    fn load_config(&mut self, stored: StageConfig) {
        self.config = stored.range_config();
        self.limits = stored.limits;
        self.limits.remember(&self.config, 0);
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Re-run range resolution and output allocation for the current inputs.
    pub fn refresh(&mut self) -> Result<()> {
        let Some(input) = self.valid_input() else {
            self.unconfigure();
            return Ok(());
        };

        let dynamic = self.entry.as_ref().map(|_| self.detector.state());
        let resolved = RangeResolver::resolve(&self.config, dynamic, &input)?;
        let sizes = resolved.sizes();
        let element_type = input.element_type();

        if self.allocator.allocate(&sizes, element_type) == Allocation::Reallocated {
            self.notifier.notify(StageEvent::OutputPropertiesChanged {
                shape: sizes,
                element_type,
            });
        }

        if self.state == StageState::Unconfigured {
            debug!(ranges = ?resolved.intervals(), "stage configured");
        }
        self.resolved = Some(resolved);
        self.state = StageState::Configured;
        Ok(())
    }

    fn update_dimensionality(&mut self) -> Result<()> {
        let Some(dimensionality) = self.matrix.as_ref().map(|m| m.dimensionality()) else {
            return Ok(());
        };

        let adaptation =
            DimensionalityAdapter::adapt(&mut self.config, &mut self.limits, dimensionality)?;
        if adaptation.changed() {
            self.notifier.notify(StageEvent::ShapeChanged {
                old_len: adaptation.old_len,
                new_len: adaptation.new_len,
            });
        }
        self.refresh()
    }

    fn range_changed(&mut self) -> Result<()> {
        if self.valid_input().is_none() {
            return Ok(());
        }
        self.refresh()?;
        self.tick().map(|_| ())
    }

    fn valid_input(&self) -> Option<Arc<Matrix>> {
        self.matrix.as_ref().filter(|m| !m.is_empty()).cloned()
    }

    fn unconfigure(&mut self) {
        if self.state == StageState::Configured {
            debug!("stage unconfigured");
        }
        self.resolved = None;
        self.state = StageState::Unconfigured;
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run one computation tick.
    ///
    /// Returns the freshly copied slice, or `None` while unconfigured.
    pub fn tick(&mut self) -> Result<Option<&Matrix>> {
        if self.state == StageState::Unconfigured {
            trace!("tick skipped, stage unconfigured");
            return Ok(None);
        }
        let Some(input) = self.matrix.clone() else {
            return Ok(None);
        };

        if let Some(entry) = self.entry.clone() {
            self.detector.detect(&entry);
            self.refresh()?;
        }

        let (Some(resolved), Some(output)) = (self.resolved.as_ref(), self.allocator.output_mut())
        else {
            return Ok(None);
        };

        let rank = input.addressed_shape().len();
        crate::invariant!(
            resolved.len() == rank,
            Invariant::ResolvedCountMismatch {
                resolved: resolved.len(),
                rank,
            }
        );
        input.copy_region_into(resolved.intervals(), output)?;

        Ok(self.allocator.output())
    }
}

impl Default for SliceStage {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration edits applied inside [`SliceStage::update_config`].
#[derive(Debug)]
pub struct ConfigBatch<'a> {
    config: &'a mut RangeConfig,
    notifier: &'a mut Notifier,
    changed: bool,
}

impl ConfigBatch<'_> {
    /// The configuration as edited so far.
    pub fn config(&self) -> &RangeConfig {
        self.config
    }

    /// Change the anchor mode.
    pub fn set_anchor(&mut self, anchor: AnchorMode) {
        if self.config.anchor() != anchor {
            self.config.set_anchor(anchor);
            self.touch();
        }
    }

    /// Change the bounds of one dimension.
    pub fn set_range(&mut self, dimension: usize, range: DimensionRange) -> Result<()> {
        if self.config.range(dimension)? != range {
            self.config.set_range(dimension, range)?;
            self.touch();
        }
        Ok(())
    }

    /// Replace every range; the count must match.
    pub fn set_ranges(&mut self, ranges: &[DimensionRange]) -> Result<()> {
        if self.config.ranges() != ranges {
            self.config.set_ranges(ranges)?;
            self.touch();
        }
        Ok(())
    }

    /// Replace only the lower bounds; the count must match.
    pub fn set_lower_values(&mut self, lower: &[u32]) -> Result<()> {
        if self.config.lower_values() != lower {
            self.config.set_lower_values(lower)?;
            self.touch();
        }
        Ok(())
    }

    /// Replace only the upper bounds; the count must match.
    pub fn set_upper_values(&mut self, upper: &[u32]) -> Result<()> {
        if self.config.upper_values() != upper {
            self.config.set_upper_values(upper)?;
            self.touch();
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.changed = true;
        self.notifier.notify(StageEvent::ConfigurationChanged);
    }
}
