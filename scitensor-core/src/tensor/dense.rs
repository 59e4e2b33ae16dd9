// scitensor-core/src/tensor/dense.rs

//! `ndarray`-backed reference implementation of [`Tensor`].

use ndarray::{ArrayD, ArrayView2, Axis, Ix2, IxDyn, Slice, Zip};

use super::{Comparison, Tensor};
use crate::error::{Result, TensorError};

/// Dense, owned, row-major `f64` tensor.
#[derive(Clone, Debug)]
pub struct DenseTensor {
    array: ArrayD<f64>,
    mask: f64,
}

impl DenseTensor {
    pub fn new(array: ArrayD<f64>) -> Self {
        Self { array, mask: 0.0 }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)))
    }

    pub fn array(&self) -> &ArrayD<f64> {
        &self.array
    }

    pub fn into_array(self) -> ArrayD<f64> {
        self.array
    }

    // Wrap a derived array, keeping this tensor's mask value.
    fn derive(&self, array: ArrayD<f64>) -> Self {
        Self {
            array,
            mask: self.mask,
        }
    }

    fn zip_with(&self, other: &Self, op: &str, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        let array = if self.array.shape() == other.array.shape() {
            Zip::from(&self.array)
                .and(&other.array)
                .map_collect(|&a, &b| f(a, b))
        } else {
            let mismatch = || {
                TensorError::shape(format!(
                    "cannot {op} tensors of shape {:?} and {:?}",
                    self.array.shape(),
                    other.array.shape()
                ))
            };
            let shape = broadcast_shape(self.array.shape(), other.array.shape())
                .ok_or_else(mismatch)?;
            let lhs = self.array.broadcast(IxDyn(&shape)).ok_or_else(mismatch)?;
            let rhs = other.array.broadcast(IxDyn(&shape)).ok_or_else(mismatch)?;
            Zip::from(&lhs).and(&rhs).map_collect(|&a, &b| f(a, b))
        };
        Ok(self.derive(array))
    }

    fn zip_assign(&mut self, other: &Self, op: &str, f: impl Fn(&mut f64, f64)) -> Result<()> {
        let rhs = other.array.broadcast(self.array.raw_dim()).ok_or_else(|| {
            TensorError::shape(format!(
                "cannot {op} a tensor of shape {:?} into shape {:?}",
                other.array.shape(),
                self.array.shape()
            ))
        })?;
        Zip::from(&mut self.array)
            .and(&rhs)
            .for_each(|a, &b| f(a, b));
        Ok(())
    }

    // Reduce the given axes by feeding every lane of reduced values to `f`.
    fn reduce_axes(&self, axes: &[usize], f: impl Fn(&[f64]) -> f64) -> Result<Self> {
        let ndim = self.array.ndim();
        let mut reduced: Vec<usize> = if axes.is_empty() {
            (0..ndim).collect()
        } else {
            axes.to_vec()
        };
        reduced.sort_unstable();
        reduced.dedup();

        if let Some(&axis) = reduced.iter().find(|&&axis| axis >= ndim) {
            return Err(TensorError::shape(format!(
                "axis {axis} out of range for tensor with {ndim} dimensions"
            )));
        }

        let kept: Vec<usize> = (0..ndim).filter(|axis| !reduced.contains(axis)).collect();
        let out_shape: Vec<usize> = kept.iter().map(|&a| self.array.len_of(Axis(a))).collect();
        let lane_len: usize = reduced.iter().map(|&a| self.array.len_of(Axis(a))).product();
        let out_len: usize = out_shape.iter().product();

        let values = if lane_len == 0 {
            vec![f(&[]); out_len]
        } else {
            let order: Vec<usize> = kept.iter().chain(reduced.iter()).copied().collect();
            let permuted: Vec<f64> = self
                .array
                .view()
                .permuted_axes(order)
                .iter()
                .copied()
                .collect();
            permuted.chunks(lane_len).map(&f).collect()
        };

        let array = ArrayD::from_shape_vec(IxDyn(&out_shape), values)
            .map_err(|e| TensorError::shape(format!("reduction failed: {e}")))?;
        Ok(self.derive(array))
    }
}

impl From<ArrayD<f64>> for DenseTensor {
    fn from(array: ArrayD<f64>) -> Self {
        Self::new(array)
    }
}

impl PartialEq for DenseTensor {
    fn eq(&self, other: &Self) -> bool {
        self.array == other.array
    }
}

/// NumPy-style broadcast of two shapes, or `None` when incompatible.
fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let dim_at = |shape: &[usize], i: usize| {
        let offset = ndim - shape.len();
        if i < offset {
            1
        } else {
            shape[i - offset]
        }
    };

    (0..ndim)
        .map(|i| match (dim_at(a, i), dim_at(b, i)) {
            (x, y) if x == y => Some(x),
            (1, y) => Some(y),
            (x, 1) => Some(x),
            _ => None,
        })
        .collect()
}

fn as_matrix(t: &DenseTensor) -> Result<ArrayView2<'_, f64>> {
    t.array.view().into_dimensionality::<Ix2>().map_err(|_| {
        TensorError::shape(format!(
            "matmul requires 2-D operands, got shape {:?}",
            t.array.shape()
        ))
    })
}

fn mean_of(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// Second and third central moments.
fn central_moments(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = mean_of(values);
    let (m2, m3) = values.iter().fold((0.0, 0.0), |(m2, m3), &v| {
        let d = v - mean;
        (m2 + d * d, m3 + d * d * d)
    });
    (m2 / n, m3 / n)
}

impl Tensor for DenseTensor {
    fn from_shape_vec(shape: &[usize], data: Vec<f64>) -> Result<Self> {
        let len = data.len();
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Self::new)
            .map_err(|e| {
                TensorError::shape(format!(
                    "cannot build tensor of shape {shape:?} from {len} values: {e}"
                ))
            })
    }

    fn shape(&self) -> Vec<usize> {
        self.array.shape().to_vec()
    }

    fn data(&self) -> Vec<f64> {
        self.array.iter().copied().collect()
    }

    fn numel(&self) -> usize {
        self.array.len()
    }

    fn mask_value(&self) -> f64 {
        self.mask
    }

    fn with_mask(&self, value: f64) -> Self {
        Self {
            array: self.array.clone(),
            mask: value,
        }
    }

    fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "subtract", |a, b| a - b)
    }

    fn mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "multiply", |a, b| a * b)
    }

    fn div(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "divide", |a, b| a / b)
    }

    fn add_scalar(&self, scalar: f64) -> Self {
        self.derive(self.array.mapv(|v| v + scalar))
    }

    fn sub_scalar(&self, scalar: f64) -> Self {
        self.derive(self.array.mapv(|v| v - scalar))
    }

    fn mul_scalar(&self, scalar: f64) -> Self {
        self.derive(self.array.mapv(|v| v * scalar))
    }

    fn div_scalar(&self, scalar: f64) -> Self {
        self.derive(self.array.mapv(|v| v / scalar))
    }

    fn add_assign(&mut self, other: &Self) -> Result<()> {
        self.zip_assign(other, "add", |a, b| *a += b)
    }

    fn sub_assign(&mut self, other: &Self) -> Result<()> {
        self.zip_assign(other, "subtract", |a, b| *a -= b)
    }

    fn mul_assign(&mut self, other: &Self) -> Result<()> {
        self.zip_assign(other, "multiply", |a, b| *a *= b)
    }

    fn div_assign(&mut self, other: &Self) -> Result<()> {
        self.zip_assign(other, "divide", |a, b| *a /= b)
    }

    fn add_assign_scalar(&mut self, scalar: f64) {
        self.array.mapv_inplace(|v| v + scalar);
    }

    fn sub_assign_scalar(&mut self, scalar: f64) {
        self.array.mapv_inplace(|v| v - scalar);
    }

    fn mul_assign_scalar(&mut self, scalar: f64) {
        self.array.mapv_inplace(|v| v * scalar);
    }

    fn div_assign_scalar(&mut self, scalar: f64) {
        self.array.mapv_inplace(|v| v / scalar);
    }

    fn matmul(&self, other: &Self) -> Result<Self> {
        let lhs = as_matrix(self)?;
        let rhs = as_matrix(other)?;

        if lhs.ncols() != rhs.nrows() {
            return Err(TensorError::shape(format!(
                "matmul inner dimensions differ: {:?} x {:?}",
                lhs.shape(),
                rhs.shape()
            )));
        }

        Ok(self.derive(lhs.dot(&rhs).into_dyn()))
    }

    fn mask(&self, cmp: Comparison, value: f64) -> Self {
        let fill = self.mask;
        self.derive(
            self.array
                .mapv(|v| if cmp.holds(v, value) { v } else { fill }),
        )
    }

    fn reshape(&self, shape: &[usize]) -> Result<Self> {
        let data = self.data();
        let len = data.len();
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(|array| self.derive(array))
            .map_err(|_| {
                TensorError::shape(format!(
                    "cannot reshape {:?} ({len} elements) into {shape:?}",
                    self.array.shape()
                ))
            })
    }

    fn broadcast(&self, shape: &[usize]) -> Result<Self> {
        let view = self.array.broadcast(IxDyn(shape)).ok_or_else(|| {
            TensorError::shape(format!(
                "cannot broadcast shape {:?} to {shape:?}",
                self.array.shape()
            ))
        })?;
        Ok(self.derive(view.to_owned()))
    }

    fn slice(&self, ranges: &[(usize, usize)]) -> Result<Self> {
        let ndim = self.array.ndim();
        if ranges.len() > ndim {
            return Err(TensorError::shape(format!(
                "{} slice ranges given for a tensor with {ndim} dimensions",
                ranges.len()
            )));
        }
        for (axis, &(low, high)) in ranges.iter().enumerate() {
            let len = self.array.len_of(Axis(axis));
            if low > high || high > len {
                return Err(TensorError::shape(format!(
                    "slice {low}..{high} out of bounds for axis {axis} of length {len}"
                )));
            }
        }

        let view = self.array.slice_each_axis(|desc| match ranges.get(desc.axis.index()) {
            Some(&(low, high)) => Slice::new(low as isize, Some(high as isize), 1),
            None => Slice::new(0, None, 1),
        });
        Ok(self.derive(view.to_owned()))
    }

    fn mean(&self, axes: &[usize]) -> Result<Self> {
        self.reduce_axes(axes, mean_of)
    }

    fn std(&self, axes: &[usize]) -> Result<Self> {
        self.reduce_axes(axes, |values| central_moments(values).0.sqrt())
    }

    fn skew(&self, axes: &[usize]) -> Result<Self> {
        self.reduce_axes(axes, |values| {
            let (m2, m3) = central_moments(values);
            m3 / m2.powf(1.5)
        })
    }

    fn detrend(&self, axis: usize) -> Result<Self> {
        let ndim = self.array.ndim();
        if axis >= ndim {
            return Err(TensorError::shape(format!(
                "axis {axis} out of range for tensor with {ndim} dimensions"
            )));
        }

        let mut array = self.array.clone();
        let n = array.len_of(Axis(axis));
        if n == 0 {
            return Ok(self.derive(array));
        }

        let n_f = n as f64;
        let x_mean = (n_f - 1.0) / 2.0;
        let sxx: f64 = (0..n).map(|i| (i as f64 - x_mean).powi(2)).sum();

        for mut lane in array.lanes_mut(Axis(axis)) {
            let y_mean = lane.sum() / n_f;
            let slope = if n < 2 {
                0.0
            } else {
                let sxy: f64 = lane
                    .iter()
                    .enumerate()
                    .map(|(i, &y)| (i as f64 - x_mean) * (y - y_mean))
                    .sum();
                sxy / sxx
            };
            for (i, y) in lane.iter_mut().enumerate() {
                *y -= y_mean + slope * (i as f64 - x_mean);
            }
        }

        Ok(self.derive(array))
    }

    fn reduce_rectangle_resolution(
        &self,
        row_block: usize,
        col_block: usize,
        invalid: f64,
    ) -> Result<Self> {
        let grid = self.array.view().into_dimensionality::<Ix2>().map_err(|_| {
            TensorError::shape(format!(
                "resolution reduction requires a 2-D tensor, got shape {:?}",
                self.array.shape()
            ))
        })?;
        if row_block == 0 || col_block == 0 {
            return Err(TensorError::shape("resolution block size must be > 0"));
        }

        let is_valid = |v: f64| {
            if invalid.is_nan() {
                !v.is_nan()
            } else {
                v != invalid
            }
        };

        let out_rows = grid.nrows() / row_block;
        let out_cols = grid.ncols() / col_block;
        let mut values = Vec::with_capacity(out_rows * out_cols);

        for block_row in 0..out_rows {
            for block_col in 0..out_cols {
                let mut sum = 0.0;
                let mut count = 0usize;
                for i in block_row * row_block..(block_row + 1) * row_block {
                    for j in block_col * col_block..(block_col + 1) * col_block {
                        let v = grid[[i, j]];
                        if is_valid(v) {
                            sum += v;
                            count += 1;
                        }
                    }
                }
                values.push(if count > 0 { sum / count as f64 } else { invalid });
            }
        }

        let array = ArrayD::from_shape_vec(IxDyn(&[out_rows, out_cols]), values)
            .map_err(|e| TensorError::shape(format!("resolution reduction failed: {e}")))?;
        Ok(self.derive(array))
    }

    fn deep_copy(&self) -> Self {
        self.clone()
    }
}
