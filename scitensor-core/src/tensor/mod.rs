// scitensor-core/src/tensor/mod.rs

//! Numeric tensor capability.
//!
//! [`Tensor`] is the set of operations a numeric array backend must provide
//! for [`TensorRecord`](crate::record::TensorRecord) to delegate to. Records
//! never depend on a concrete backend type; [`DenseTensor`] is the reference
//! implementation backed by `ndarray`.
//!
//! Every operation that produces a new array returns a new value. Only the
//! `*_assign` methods mutate the receiver. Shape and axis arguments are
//! validated by the backend and reported as [`TensorError::Shape`].
//!
//! [`TensorError::Shape`]: crate::error::TensorError::Shape

mod dense;

pub use dense::DenseTensor;

use std::fmt;

use crate::error::Result;

/// Predicate used by masking operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    /// Returns true when `lhs <op> rhs` holds.
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Eq => lhs == rhs,
            Comparison::Ne => lhs != rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Capability set of a dense numeric array backend.
pub trait Tensor: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    // === Creation ===

    /// Build a tensor from a row-major flat buffer.
    ///
    /// Fails when `data.len()` is not the product of `shape`.
    fn from_shape_vec(shape: &[usize], data: Vec<f64>) -> Result<Self>;

    // === Accessors ===

    fn shape(&self) -> Vec<usize>;

    /// Values in row-major order.
    fn data(&self) -> Vec<f64>;

    fn numel(&self) -> usize {
        self.shape().iter().product()
    }

    /// Value written into positions rejected by a mask (0.0 by default).
    fn mask_value(&self) -> f64;

    /// Copy of this tensor with a different mask value.
    fn with_mask(&self, value: f64) -> Self;

    // === Element-wise arithmetic ===
    // Operands must have equal or broadcast-compatible shapes.

    fn add(&self, other: &Self) -> Result<Self>;
    fn sub(&self, other: &Self) -> Result<Self>;
    fn mul(&self, other: &Self) -> Result<Self>;
    fn div(&self, other: &Self) -> Result<Self>;

    fn add_scalar(&self, scalar: f64) -> Self;
    fn sub_scalar(&self, scalar: f64) -> Self;
    fn mul_scalar(&self, scalar: f64) -> Self;
    fn div_scalar(&self, scalar: f64) -> Self;

    // === In-place arithmetic ===
    // `other` must broadcast to the receiver's shape.

    fn add_assign(&mut self, other: &Self) -> Result<()>;
    fn sub_assign(&mut self, other: &Self) -> Result<()>;
    fn mul_assign(&mut self, other: &Self) -> Result<()>;
    fn div_assign(&mut self, other: &Self) -> Result<()>;

    fn add_assign_scalar(&mut self, scalar: f64);
    fn sub_assign_scalar(&mut self, scalar: f64);
    fn mul_assign_scalar(&mut self, scalar: f64);
    fn div_assign_scalar(&mut self, scalar: f64);

    // === Linear algebra ===

    /// Matrix product of two 2-D tensors.
    fn matmul(&self, other: &Self) -> Result<Self>;

    // === Masking ===

    /// Keep elements where `element <cmp> value` holds, replace the rest
    /// with [`mask_value`](Tensor::mask_value).
    fn mask(&self, cmp: Comparison, value: f64) -> Self;

    // === Shape ===

    fn reshape(&self, shape: &[usize]) -> Result<Self>;

    fn broadcast(&self, shape: &[usize]) -> Result<Self>;

    /// One `(low_inclusive, high_exclusive)` range per leading dimension;
    /// dimensions without a range are kept whole.
    fn slice(&self, ranges: &[(usize, usize)]) -> Result<Self>;

    // === Statistics ===
    // An empty axis list reduces over every axis.

    fn mean(&self, axes: &[usize]) -> Result<Self>;

    /// Population standard deviation.
    fn std(&self, axes: &[usize]) -> Result<Self>;

    /// Population skewness.
    fn skew(&self, axes: &[usize]) -> Result<Self>;

    /// Remove the least-squares linear trend from every lane along `axis`.
    fn detrend(&self, axis: usize) -> Result<Self>;

    // === Resolution ===

    /// Average non-overlapping `block x block` cells of a 2-D tensor,
    /// skipping elements equal to `invalid`.
    fn reduce_resolution(&self, block: usize, invalid: f64) -> Result<Self> {
        self.reduce_rectangle_resolution(block, block, invalid)
    }

    fn reduce_rectangle_resolution(
        &self,
        row_block: usize,
        col_block: usize,
        invalid: f64,
    ) -> Result<Self>;

    /// Backend-level copy that shares no storage with `self`.
    fn deep_copy(&self) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_holds() {
        assert!(Comparison::Lt.holds(1.0, 2.0));
        assert!(!Comparison::Lt.holds(2.0, 2.0));
        assert!(Comparison::Le.holds(2.0, 2.0));
        assert!(Comparison::Gt.holds(3.0, 2.0));
        assert!(Comparison::Ge.holds(2.0, 2.0));
        assert!(Comparison::Eq.holds(2.0, 2.0));
        assert!(Comparison::Ne.holds(1.0, 2.0));
        // NaN never satisfies an ordered comparison
        assert!(!Comparison::Le.holds(f64::NAN, 2.0));
        assert!(Comparison::Ne.holds(f64::NAN, 2.0));
    }

    #[test]
    fn test_comparison_display() {
        assert_eq!(Comparison::Ge.to_string(), ">=");
        assert_eq!(Comparison::Ne.to_string(), "!=");
    }
}
