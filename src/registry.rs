//! Stage registry: explicit declarations for host discovery.
//!
//! Nothing registers itself. An application bootstrap creates a [`Registry`]
//! and calls [`register_builtin`] (or [`Registry::register`] for its own
//! declarations) before looking stages up by name.

use crate::error::{Result, SliceError};
use crate::matrix::Matrix;
use crate::stage::{SliceStage, SLICE_OUTPUT};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Name under which the slice stage is registered.
pub const MATRIX_SLICE: &str = "MatrixSlice";

/// An input slot and the dimensionality it accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotDeclaration {
    pub name: &'static str,
    pub required: bool,
    pub dimensionality: RangeInclusive<usize>,
}

impl SlotDeclaration {
    /// Declare a slot.
    pub fn new(name: &'static str, required: bool, dimensionality: RangeInclusive<usize>) -> Self {
        Self {
            name,
            required,
            dimensionality,
        }
    }

    /// Whether `matrix` has a dimensionality this slot accepts.
    pub fn accepts(&self, matrix: &Matrix) -> bool {
        self.dimensionality.contains(&matrix.dimensionality())
    }

    /// Type-check `matrix` against this slot.
    pub fn check(&self, matrix: &Matrix) -> Result<()> {
        if self.accepts(matrix) {
            return Ok(());
        }
        Err(SliceError::IncompatibleInput {
            slot: self.name.to_string(),
            dimensionality: matrix.dimensionality(),
            accepted: self.dimensionality.clone(),
        })
    }
}

/// Everything a host needs to list and construct a stage.
#[derive(Clone, Debug)]
pub struct StageDeclaration {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub inputs: Vec<SlotDeclaration>,
    pub outputs: Vec<&'static str>,
    pub construct: fn() -> SliceStage,
}

impl StageDeclaration {
    /// Look up an input slot by name.
    pub fn input(&self, name: &str) -> Option<&SlotDeclaration> {
        self.inputs.iter().find(|slot| slot.name == name)
    }

    /// Construct a fresh stage.
    pub fn instantiate(&self) -> SliceStage {
        (self.construct)()
    }
}

/// Declaration of the matrix slice stage.
pub fn matrix_slice_declaration() -> StageDeclaration {
    StageDeclaration {
        name: MATRIX_SLICE,
        category: "Utilities",
        description: "Extracts a subregion of a matrix.",
        inputs: vec![SliceStage::matrix_slot(), SliceStage::entry_slot()],
        outputs: vec![SLICE_OUTPUT],
        construct: SliceStage::new,
    }
}

/// Stage declarations keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    declarations: BTreeMap<&'static str, StageDeclaration>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration, returning the one it replaced.
    pub fn register(&mut self, declaration: StageDeclaration) -> Option<StageDeclaration> {
        self.declarations.insert(declaration.name, declaration)
    }

    /// Look up a declaration by name.
    pub fn get(&self, name: &str) -> Option<&StageDeclaration> {
        self.declarations.get(name)
    }

    /// Construct a registered stage by name.
    pub fn instantiate(&self, name: &str) -> Option<SliceStage> {
        self.get(name).map(StageDeclaration::instantiate)
    }

    /// Registered names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.declarations.keys().copied()
    }

    /// Declarations listed under `category`.
    pub fn in_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a StageDeclaration> {
        self.declarations
            .values()
            .filter(move |declaration| declaration.category == category)
    }

    /// Number of registered stages.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Register every stage this crate provides.
pub fn register_builtin(registry: &mut Registry) {
    registry.register(matrix_slice_declaration());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{StageState, ENTRY_INPUT, MATRIX_INPUT};
    use ndarray::{Array1, Array2, ArrayD, IxDyn};

    #[test]
    fn test_register_builtin() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        register_builtin(&mut registry);

        assert_eq!(registry.names().collect::<Vec<_>>(), vec![MATRIX_SLICE]);
        assert_eq!(registry.in_category("Utilities").count(), 1);

        let stage = registry.instantiate(MATRIX_SLICE).unwrap();
        assert_eq!(stage.state(), StageState::Unconfigured);
        assert!(registry.instantiate("Nope").is_none());
    }

    #[test]
    fn test_declared_slots() {
        let declaration = matrix_slice_declaration();

        let matrix = declaration.input(MATRIX_INPUT).unwrap();
        assert!(matrix.required);
        assert_eq!(matrix.dimensionality, 1..=16);

        let entry = declaration.input(ENTRY_INPUT).unwrap();
        assert!(!entry.required);
        assert_eq!(entry.dimensionality, 0..=1);

        assert_eq!(declaration.outputs, vec![SLICE_OUTPUT]);
    }

    #[test]
    fn test_slot_check() {
        let matrix_slot = SliceStage::matrix_slot();
        let entry_slot = SliceStage::entry_slot();

        let scalar = Matrix::from(ArrayD::<f32>::zeros(IxDyn(&[])));
        let vector = Matrix::from(Array1::<f32>::zeros(4).into_dyn());
        let plane = Matrix::from(Array2::<f32>::zeros((4, 4)).into_dyn());

        assert!(!matrix_slot.accepts(&scalar));
        assert!(matrix_slot.accepts(&vector));
        assert!(entry_slot.accepts(&scalar));
        assert!(entry_slot.accepts(&vector));

        let err = entry_slot.check(&plane).unwrap_err();
        assert!(matches!(
            err,
            SliceError::IncompatibleInput { dimensionality: 2, .. }
        ));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = Registry::new();
        assert!(registry.register(matrix_slice_declaration()).is_none());
        assert!(registry.register(matrix_slice_declaration()).is_some());
        assert_eq!(registry.len(), 1);
    }
}
