//! Matrix type: an owned n-dimensional array tagged with its element type.
//!
//! Inputs arrive as shared, read-only matrices and the stage's output is an
//! independently owned one. Arrays of rank 0 and 1 are addressed as 2-D
//! (`[] -> 1x1`, `[n] -> n x 1`), following the usual matrix convention that
//! a vector is a single column.

use crate::error::{Invariant, Result};
use crate::resolver::Interval;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element types a [`Matrix`] can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    U8,
    I32,
    F32,
    F64,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "u8",
            ElementType::I32 => "i32",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A scalar type that can be stored in a [`Matrix`].
pub trait Element: Clone + Copy + Default + PartialEq + fmt::Debug + 'static {
    /// The tag for this element type.
    const TYPE: ElementType;

    /// Wrap an array of this element type.
    fn wrap(array: ArrayD<Self>) -> Matrix;

    /// Borrow the array if the matrix holds this element type.
    fn unwrap_ref(matrix: &Matrix) -> Option<&ArrayD<Self>>;

    /// Mutably borrow the array if the matrix holds this element type.
    fn unwrap_mut(matrix: &mut Matrix) -> Option<&mut ArrayD<Self>>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const TYPE: ElementType = ElementType::$variant;

            fn wrap(array: ArrayD<Self>) -> Matrix {
                Matrix::$variant(array)
            }

            fn unwrap_ref(matrix: &Matrix) -> Option<&ArrayD<Self>> {
                match matrix {
                    Matrix::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn unwrap_mut(matrix: &mut Matrix) -> Option<&mut ArrayD<Self>> {
                match matrix {
                    Matrix::$variant(array) => Some(array),
                    _ => None,
                }
            }
        }

        impl From<ArrayD<$ty>> for Matrix {
            fn from(array: ArrayD<$ty>) -> Self {
                Matrix::$variant(array)
            }
        }
    };
}

impl_element!(u8, U8);
impl_element!(i32, I32);
impl_element!(f32, F32);
impl_element!(f64, F64);

/// Runs `$body` with `$array` bound to the inner array, whatever its type.
macro_rules! with_array {
    ($matrix:expr, $array:ident => $body:expr) => {
        match $matrix {
            Matrix::U8($array) => $body,
            Matrix::I32($array) => $body,
            Matrix::F32($array) => $body,
            Matrix::F64($array) => $body,
        }
    };
}

/// An n-dimensional numeric array.
#[derive(Clone, Debug, PartialEq)]
pub enum Matrix {
    U8(ArrayD<u8>),
    I32(ArrayD<i32>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

impl Matrix {
    /// Create a zero-filled matrix.
    pub fn zeros(shape: &[usize], element_type: ElementType) -> Self {
        let dim = IxDyn(shape);
        match element_type {
            ElementType::U8 => Matrix::U8(ArrayD::zeros(dim)),
            ElementType::I32 => Matrix::I32(ArrayD::zeros(dim)),
            ElementType::F32 => Matrix::F32(ArrayD::zeros(dim)),
            ElementType::F64 => Matrix::F64(ArrayD::zeros(dim)),
        }
    }

    /// Wrap any supported array.
    pub fn from_array<T: Element>(array: ArrayD<T>) -> Self {
        T::wrap(array)
    }

    /// Borrow the inner array as element type `T`.
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::unwrap_ref(self)
    }

    /// Mutably borrow the inner array as element type `T`.
    pub fn as_array_mut<T: Element>(&mut self) -> Option<&mut ArrayD<T>> {
        T::unwrap_mut(self)
    }

    /// Get the element type.
    pub fn element_type(&self) -> ElementType {
        match self {
            Matrix::U8(_) => ElementType::U8,
            Matrix::I32(_) => ElementType::I32,
            Matrix::F32(_) => ElementType::F32,
            Matrix::F64(_) => ElementType::F64,
        }
    }

    /// The stored shape, one entry per axis.
    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    /// Number of stored axes.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality in the matrix sense.
    ///
    /// Rank 0 and 1 arrays, and rank 2 arrays, count their non-singleton
    /// axes (`1x1 -> 0`, `1xN -> 1`, `MxN -> 2`). Higher ranks report the
    /// rank itself.
    pub fn dimensionality(&self) -> usize {
        let shape = self.shape();
        match shape.len() {
            0 => 0,
            1 => usize::from(shape[0] != 1),
            2 => shape.iter().filter(|&&n| n != 1).count(),
            rank => rank,
        }
    }

    /// Shape as addressed by slicing: never fewer than two axes.
    pub fn addressed_shape(&self) -> Vec<usize> {
        let mut shape = self.shape().to_vec();
        while shape.len() < 2 {
            shape.push(1);
        }
        shape
    }

    /// Iterate all elements in logical order, widened to `f64`.
    pub fn values_f64(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            Matrix::U8(a) => Box::new(a.iter().map(|&v| f64::from(v))),
            Matrix::I32(a) => Box::new(a.iter().map(|&v| f64::from(v))),
            Matrix::F32(a) => Box::new(a.iter().map(|&v| f64::from(v))),
            Matrix::F64(a) => Box::new(a.iter().copied()),
        }
    }

    /// Deep-copy the region addressed by `ranges` into `out`.
    ///
    /// `ranges` holds one non-empty interval per addressed axis, each inside
    /// its axis, and `out` must already have the region's shape and this
    /// matrix's element type.
    pub fn copy_region_into(&self, ranges: &[Interval], out: &mut Matrix) -> Result<()> {
        crate::invariant!(
            out.element_type() == self.element_type(),
            Invariant::ElementTypeMismatch {
                expected: self.element_type(),
                got: out.element_type(),
            }
        );

        let shape = self.addressed_shape();
        crate::invariant!(
            ranges.len() == shape.len(),
            Invariant::ResolvedCountMismatch {
                resolved: ranges.len(),
                rank: shape.len(),
            }
        );
        for (axis, (interval, &size)) in ranges.iter().zip(&shape).enumerate() {
            crate::invariant!(
                interval.start < interval.end && interval.end <= size,
                Invariant::IntervalOutOfBounds {
                    axis,
                    start: interval.start,
                    end: interval.end,
                    size,
                }
            );
        }

        let region: Vec<usize> = ranges.iter().map(Interval::len).collect();
        crate::invariant!(
            out.shape() == region.as_slice(),
            Invariant::RegionShapeMismatch {
                expected: region,
                got: out.shape().to_vec(),
            }
        );

        match (self, out) {
            (Matrix::U8(src), Matrix::U8(dst)) => copy_region(src, ranges, dst),
            (Matrix::I32(src), Matrix::I32(dst)) => copy_region(src, ranges, dst),
            (Matrix::F32(src), Matrix::F32(dst)) => copy_region(src, ranges, dst),
            (Matrix::F64(src), Matrix::F64(dst)) => copy_region(src, ranges, dst),
            _ => unreachable!("element types checked above"),
        }
        Ok(())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.element_type(), self.shape())
    }
}

fn addressed_view<T>(array: &ArrayD<T>) -> ArrayViewD<'_, T> {
    let mut view = array.view();
    while view.ndim() < 2 {
        let next = view.ndim();
        view = view.insert_axis(Axis(next));
    }
    view
}

fn copy_region<T: Clone>(src: &ArrayD<T>, ranges: &[Interval], dst: &mut ArrayD<T>) {
    let view = addressed_view(src);
    let region = view.slice_each_axis(|axis| {
        let interval = ranges[axis.axis.index()];
        Slice::from(interval.start..interval.end)
    });
    dst.assign(&region);
}
