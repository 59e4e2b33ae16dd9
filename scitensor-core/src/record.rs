// scitensor-core/src/record.rs

//! Named-variable tensor records.
//!
//! A [`TensorRecord`] holds one or more named tensors plus free-form string
//! metadata. A cursor selects the variable every unary operation acts on.
//!
//! Records are immutable apart from a small set of staging operations:
//! [`select_variable`](TensorRecord::select_variable),
//! [`insert_variable`](TensorRecord::insert_variable),
//! [`insert_metadata`](TensorRecord::insert_metadata),
//! [`reshape`](TensorRecord::reshape), [`tensor_mut`](TensorRecord::tensor_mut)
//! and the `*_assign` operators. Everything else returns a new record.
//!
//! # Example
//!
//! ```
//! use scitensor_core::{DenseTensor, Tensor, TensorRecord};
//!
//! let t = DenseTensor::from_shape_vec(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//! let record = TensorRecord::new("temp", t);
//!
//! let shifted = &record + 1.0;
//! assert_eq!(shifted.data(), vec![2.0, 3.0, 4.0, 5.0]);
//! assert_eq!(record.data(), vec![1.0, 2.0, 3.0, 4.0]);
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::archive::{Archive, ArchiveField, ArchiveWriter};
use crate::error::{Result, TensorError};
use crate::tensor::{Comparison, Tensor};

/// Ordered set of named tensors with metadata and an active-variable cursor.
#[derive(Debug, Clone)]
pub struct TensorRecord<T: Tensor> {
    // Insertion order; names are unique and entries are never removed.
    variables: Vec<(String, Arc<T>)>,
    metadata: HashMap<String, String>,
    cursor: usize,
}

impl<T: Tensor> TensorRecord<T> {
    /// Creates a record holding a single variable, which becomes the cursor.
    pub fn new(name: impl Into<String>, tensor: T) -> Self {
        Self {
            variables: vec![(name.into(), Arc::new(tensor))],
            metadata: HashMap::new(),
            cursor: 0,
        }
    }

    /// Creates a single-variable record with initial metadata.
    pub fn with_metadata<I, K, V>(name: impl Into<String>, tensor: T, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new(name, tensor);
        record.insert_metadata(pairs);
        record
    }

    /// Rebuilds a record from a decoded archive.
    ///
    /// Fields become variables in archive order and attributes become
    /// metadata. The cursor starts on the first field.
    pub fn from_archive(archive: &Archive) -> Result<Self> {
        let mut fields = archive.fields.iter();
        let first = fields
            .next()
            .ok_or_else(|| TensorError::archive("archive contains no fields"))?;

        let mut record = Self::new(first.name.clone(), field_to_tensor(first)?);
        for field in fields {
            record.insert_variable(field.name.clone(), field_to_tensor(field)?);
        }
        record.metadata = archive.attributes.clone();
        Ok(record)
    }

    // === Accessors ===

    /// Name of the variable unary operations act on.
    pub fn variable_in_use(&self) -> &str {
        &self.variables[self.cursor].0
    }

    /// The cursor tensor.
    pub fn tensor(&self) -> &T {
        &self.variables[self.cursor].1
    }

    /// Mutable access to the cursor tensor.
    ///
    /// Storage shared with other records is cloned before the first write.
    pub fn tensor_mut(&mut self) -> &mut T {
        Arc::make_mut(&mut self.variables[self.cursor].1)
    }

    pub fn variable(&self, name: &str) -> Option<&T> {
        self.variable_handle(name).map(|t| t.as_ref())
    }

    /// Shared handle to a variable's storage.
    pub fn variable_handle(&self, name: &str) -> Option<&Arc<T>> {
        self.position(name).map(|i| &self.variables[i].1)
    }

    /// Variable names in insertion order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.iter().map(|(name, _)| name.as_str())
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn shape(&self) -> Vec<usize> {
        self.tensor().shape()
    }

    pub fn data(&self) -> Vec<f64> {
        self.tensor().data()
    }

    // === Staging (mutating) ===

    /// Moves the cursor to `name`.
    ///
    /// An unknown name is logged and leaves the cursor where it was; callers
    /// that care must check [`variable_in_use`](Self::variable_in_use).
    pub fn select_variable(&mut self, name: &str) -> &mut Self {
        match self.position(name) {
            Some(index) => self.cursor = index,
            None => tracing::error!(
                variable = name,
                in_use = self.variable_in_use(),
                "variable not found in record, cursor unchanged"
            ),
        }
        self
    }

    /// Inserts or overwrites a variable. The cursor does not move.
    pub fn insert_variable(&mut self, name: impl Into<String>, tensor: T) -> &mut Self {
        let name = name.into();
        let tensor = Arc::new(tensor);
        match self.position(&name) {
            Some(index) => self.variables[index].1 = tensor,
            None => self.variables.push((name, tensor)),
        }
        self
    }

    pub fn insert_metadata<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Reshapes the cursor tensor and stores the result under `target`
    /// (the cursor variable when `None`), overwriting any existing entry.
    pub fn reshape(&mut self, shape: &[usize], target: Option<&str>) -> Result<&mut Self> {
        let reshaped = self.tensor().reshape(shape)?;
        let name = target.unwrap_or(self.variable_in_use()).to_string();
        Ok(self.insert_variable(name, reshaped))
    }

    // === Algebra ===

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.tensor().add(other.tensor()).map(|t| self.wrap(t))
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.tensor().sub(other.tensor()).map(|t| self.wrap(t))
    }

    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.tensor().mul(other.tensor()).map(|t| self.wrap(t))
    }

    pub fn div(&self, other: &Self) -> Result<Self> {
        self.tensor().div(other.tensor()).map(|t| self.wrap(t))
    }

    pub fn matmul(&self, other: &Self) -> Result<Self> {
        self.tensor().matmul(other.tensor()).map(|t| self.wrap(t))
    }

    pub fn add_scalar(&self, scalar: f64) -> Self {
        self.wrap(self.tensor().add_scalar(scalar))
    }

    pub fn sub_scalar(&self, scalar: f64) -> Self {
        self.wrap(self.tensor().sub_scalar(scalar))
    }

    pub fn mul_scalar(&self, scalar: f64) -> Self {
        self.wrap(self.tensor().mul_scalar(scalar))
    }

    pub fn div_scalar(&self, scalar: f64) -> Self {
        self.wrap(self.tensor().div_scalar(scalar))
    }

    pub fn add_assign_record(&mut self, other: &Self) -> Result<()> {
        self.assign_with(other, T::add_assign)
    }

    pub fn sub_assign_record(&mut self, other: &Self) -> Result<()> {
        self.assign_with(other, T::sub_assign)
    }

    pub fn mul_assign_record(&mut self, other: &Self) -> Result<()> {
        self.assign_with(other, T::mul_assign)
    }

    pub fn div_assign_record(&mut self, other: &Self) -> Result<()> {
        self.assign_with(other, T::div_assign)
    }

    // === Masking ===

    /// Keeps elements where `element <cmp> value` holds; the rest become the
    /// cursor tensor's mask value.
    pub fn mask(&self, cmp: Comparison, value: f64) -> Self {
        self.wrap(self.tensor().mask(cmp, value))
    }

    pub fn mask_lt(&self, value: f64) -> Self {
        self.mask(Comparison::Lt, value)
    }

    pub fn mask_le(&self, value: f64) -> Self {
        self.mask(Comparison::Le, value)
    }

    pub fn mask_gt(&self, value: f64) -> Self {
        self.mask(Comparison::Gt, value)
    }

    pub fn mask_ge(&self, value: f64) -> Self {
        self.mask(Comparison::Ge, value)
    }

    pub fn mask_eq(&self, value: f64) -> Self {
        self.mask(Comparison::Eq, value)
    }

    pub fn mask_ne(&self, value: f64) -> Self {
        self.mask(Comparison::Ne, value)
    }

    /// Returns a record whose cursor tensor masks with `value`. Sibling
    /// variables and metadata are kept.
    pub fn set_mask(&self, value: f64) -> Self {
        self.replace_cursor(self.tensor().with_mask(value))
    }

    // === Statistics and shape ===

    pub fn mean(&self, axes: &[usize]) -> Result<Self> {
        self.tensor().mean(axes).map(|t| self.wrap(t))
    }

    pub fn std(&self, axes: &[usize]) -> Result<Self> {
        self.tensor().std(axes).map(|t| self.wrap(t))
    }

    pub fn skew(&self, axes: &[usize]) -> Result<Self> {
        self.tensor().skew(axes).map(|t| self.wrap(t))
    }

    pub fn detrend(&self, axis: usize) -> Result<Self> {
        self.tensor().detrend(axis).map(|t| self.wrap(t))
    }

    pub fn broadcast(&self, shape: &[usize]) -> Result<Self> {
        self.tensor().broadcast(shape).map(|t| self.wrap(t))
    }

    pub fn slice(&self, ranges: &[(usize, usize)]) -> Result<Self> {
        self.tensor().slice(ranges).map(|t| self.wrap(t))
    }

    /// Block-averages the cursor tensor; pass `f64::NAN` as `invalid` to
    /// skip missing values.
    pub fn reduce_resolution(&self, block: usize, invalid: f64) -> Result<Self> {
        self.tensor()
            .reduce_resolution(block, invalid)
            .map(|t| self.wrap(t))
    }

    pub fn reduce_rectangle_resolution(
        &self,
        row_block: usize,
        col_block: usize,
        invalid: f64,
    ) -> Result<Self> {
        self.tensor()
            .reduce_rectangle_resolution(row_block, col_block, invalid)
            .map(|t| self.wrap(t))
    }

    // === Copy and persistence ===

    /// Deep-copies the cursor tensor. Other variables keep sharing storage
    /// with `self`.
    pub fn copy(&self) -> Self {
        self.replace_cursor(self.tensor().deep_copy())
    }

    /// Writes every variable as a named `f32` field and every metadata entry
    /// as an attribute.
    pub fn serialize(&self, writer: &ArchiveWriter, path: impl AsRef<Path>) -> Result<()> {
        writer.write(path.as_ref(), &self.to_archive())
    }

    /// Archive image of this record, values narrowed to `f32`.
    pub fn to_archive(&self) -> Archive {
        let fields = self
            .variables
            .iter()
            .map(|(name, tensor)| ArchiveField {
                name: name.clone(),
                shape: tensor.shape(),
                values: tensor.data().into_iter().map(|v| v as f32).collect(),
            })
            .collect();

        Archive {
            fields,
            attributes: self.metadata.clone(),
        }
    }

    // === Internals ===

    fn position(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|(n, _)| n == name)
    }

    // Single-variable record under the cursor name, carrying our metadata.
    fn wrap(&self, tensor: T) -> Self {
        Self {
            variables: vec![(self.variable_in_use().to_string(), Arc::new(tensor))],
            metadata: self.metadata.clone(),
            cursor: 0,
        }
    }

    fn replace_cursor(&self, tensor: T) -> Self {
        let mut record = self.clone();
        record.variables[record.cursor].1 = Arc::new(tensor);
        record
    }

    fn assign_with(&mut self, other: &Self, op: fn(&mut T, &T) -> Result<()>) -> Result<()> {
        let mut result = self.tensor().clone();
        op(&mut result, other.tensor())?;
        *self = self.wrap(result);
        Ok(())
    }
}

fn field_to_tensor<T: Tensor>(field: &ArchiveField) -> Result<T> {
    let values = field.values.iter().map(|&v| f64::from(v)).collect();
    T::from_shape_vec(&field.shape, values)
}

impl<T: Tensor> PartialEq for TensorRecord<T> {
    /// Compares variables by name and metadata; the cursor is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata
            && self.variables.len() == other.variables.len()
            && self
                .variables
                .iter()
                .all(|(name, tensor)| other.variable(name) == Some(tensor.as_ref()))
    }
}

macro_rules! impl_record_ops {
    ($op:ident, $op_fn:ident, $assign:ident, $assign_fn:ident, $binary:ident, $scalar:ident, $tensor_scalar_assign:ident) => {
        impl<T: Tensor> std::ops::$op<f64> for &TensorRecord<T> {
            type Output = TensorRecord<T>;

            fn $op_fn(self, rhs: f64) -> TensorRecord<T> {
                self.$scalar(rhs)
            }
        }

        impl<T: Tensor> std::ops::$op<&TensorRecord<T>> for &TensorRecord<T> {
            type Output = Result<TensorRecord<T>>;

            fn $op_fn(self, rhs: &TensorRecord<T>) -> Result<TensorRecord<T>> {
                self.$binary(rhs)
            }
        }

        impl<T: Tensor> std::ops::$assign<f64> for TensorRecord<T> {
            fn $assign_fn(&mut self, rhs: f64) {
                let mut result = self.tensor().clone();
                result.$tensor_scalar_assign(rhs);
                *self = self.wrap(result);
            }
        }
    };
}

impl_record_ops!(Add, add, AddAssign, add_assign, add, add_scalar, add_assign_scalar);
impl_record_ops!(Sub, sub, SubAssign, sub_assign, sub, sub_scalar, sub_assign_scalar);
impl_record_ops!(Mul, mul, MulAssign, mul_assign, mul, mul_scalar, mul_assign_scalar);
impl_record_ops!(Div, div, DivAssign, div_assign, div, div_scalar, div_assign_scalar);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveReader;
    use crate::config::{ArchiveConfig, StorageConfig};
    use crate::storage::LocalStorage;
    use crate::tensor::DenseTensor;
    use tempfile::TempDir;

    fn grid(values: [f64; 4]) -> DenseTensor {
        DenseTensor::from_shape_vec(&[2, 2], values.to_vec()).unwrap()
    }

    fn record(name: &str, values: [f64; 4]) -> TensorRecord<DenseTensor> {
        TensorRecord::new(name, grid(values))
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_new_and_accessors() {
        let r = TensorRecord::with_metadata("temp", grid([1.0, 2.0, 3.0, 4.0]), [("units", "K")]);

        assert_eq!(r.variable_in_use(), "temp");
        assert_eq!(r.shape(), vec![2, 2]);
        assert_eq!(r.data(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(r.num_variables(), 1);
        assert_eq!(r.metadata_value("units"), Some("K"));
        assert!(r.contains_variable("temp"));
        assert!(r.variable("precip").is_none());
    }

    #[test]
    fn test_add_leaves_operands_unchanged() {
        let a = record("temp", [1.0, 2.0, 3.0, 4.0]);
        let b = record("temp", [5.0, 6.0, 7.0, 8.0]);

        let sum = (&a + &b).unwrap();

        assert_eq!(sum.data(), vec![6.0, 8.0, 10.0, 12.0]);
        assert_eq!(a.data(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(b.data(), vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_result_carries_left_name_and_metadata() {
        let mut a = record("temp", [1.0, 2.0, 3.0, 4.0]);
        a.insert_metadata([("units", "K")]);
        a.insert_variable("precip", grid([0.0; 4]));
        let b = record("other", [1.0; 4]);

        let product = (&a * &b).unwrap();
        assert_eq!(product.variable_in_use(), "temp");
        assert_eq!(product.metadata_value("units"), Some("K"));
        // Algebra results hold only the derived variable
        assert_eq!(product.num_variables(), 1);
    }

    #[test]
    fn test_scalar_round_trip() {
        let r = record("temp", [1.5, -2.0, 3.25, 1e6]);
        for s in [0.0, 1.0, -7.5, 0.1, 12345.678] {
            let back = &(&r + s) - s;
            assert_close(&back.data(), &r.data());
        }

        let scaled = &(&r * 4.0) / 4.0;
        assert_close(&scaled.data(), &r.data());
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let a = record("temp", [1.0; 4]);
        let b = TensorRecord::new("temp", DenseTensor::zeros(&[3, 3]));

        let err = (&a + &b).unwrap_err();
        assert!(matches!(err, TensorError::Shape { .. }));
        assert!(a.matmul(&b).is_err());
    }

    #[test]
    fn test_matmul() {
        let a = record("m", [1.0, 2.0, 3.0, 4.0]);
        let identity = record("i", [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(a.matmul(&identity).unwrap().data(), a.data());
    }

    #[test]
    fn test_in_place_operators() {
        let mut r = record("temp", [1.0, 2.0, 3.0, 4.0]);
        r.insert_variable("precip", grid([0.0; 4]));

        r += 1.0;
        r *= 2.0;
        r -= 2.0;
        r /= 2.0;
        assert_eq!(r.data(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(r.num_variables(), 1);

        let other = record("temp", [1.0, 1.0, 1.0, 1.0]);
        r.add_assign_record(&other).unwrap();
        r.mul_assign_record(&other).unwrap();
        r.sub_assign_record(&other).unwrap();
        r.div_assign_record(&other).unwrap();
        assert_eq!(r.data(), vec![1.0, 2.0, 3.0, 4.0]);

        let wrong = TensorRecord::new("temp", DenseTensor::zeros(&[3]));
        assert!(r.add_assign_record(&wrong).is_err());
        assert_eq!(r.data(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_in_place_does_not_touch_shared_storage() {
        let original = record("temp", [1.0, 2.0, 3.0, 4.0]);
        let mut alias = original.clone();
        alias += 10.0;
        assert_eq!(original.data(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_select_variable() {
        let mut r = record("temp", [1.0; 4]);
        r.insert_variable("precip", grid([2.0; 4]));

        r.select_variable("precip");
        assert_eq!(r.variable_in_use(), "precip");
        assert_eq!(r.data(), vec![2.0; 4]);
    }

    #[test]
    fn test_select_missing_variable_is_noop() {
        let mut r = record("temp", [1.0; 4]);
        let before = r.clone();

        let returned: *const TensorRecord<DenseTensor> = r.select_variable("missing");

        assert!(std::ptr::eq(returned, &r));
        assert_eq!(r.variable_in_use(), "temp");
        assert_eq!(r, before);
    }

    #[test]
    fn test_insert_variable_overwrites() {
        let mut r = record("temp", [1.0; 4]);
        r.insert_variable("precip", grid([2.0; 4]))
            .insert_variable("temp", grid([3.0; 4]));

        assert_eq!(r.variable_names().collect::<Vec<_>>(), vec!["temp", "precip"]);
        assert_eq!(r.data(), vec![3.0; 4]);
    }

    #[test]
    fn test_reshape_into_target() {
        let mut r = record("temp", [1.0, 2.0, 3.0, 4.0]);
        r.reshape(&[4], Some("flat")).unwrap();

        assert_eq!(r.variable_in_use(), "temp");
        assert_eq!(r.shape(), vec![2, 2]);
        assert_eq!(r.variable("flat").unwrap().shape(), vec![4]);

        r.reshape(&[1, 4], None).unwrap();
        assert_eq!(r.shape(), vec![1, 4]);

        assert!(r.reshape(&[3], None).is_err());
    }

    #[test]
    fn test_masking() {
        let r = record("temp", [1.0, 2.0, 3.0, 4.0]);

        let masked = r.mask_le(2.0);
        assert_eq!(masked.data(), vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(masked.shape(), vec![2, 2]);
        assert_eq!(r.data(), vec![1.0, 2.0, 3.0, 4.0]);

        assert_eq!(r.mask_lt(2.0).data(), vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(r.mask_gt(2.0).data(), vec![0.0, 0.0, 3.0, 4.0]);
        assert_eq!(r.mask_ge(3.0).data(), vec![0.0, 0.0, 3.0, 4.0]);
        assert_eq!(r.mask_eq(4.0).data(), vec![0.0, 0.0, 0.0, 4.0]);
        assert_eq!(r.mask_ne(4.0).data(), vec![1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_set_mask() {
        let mut r = record("temp", [1.0, 2.0, 3.0, 4.0]);
        r.insert_variable("precip", grid([0.0; 4]));

        let custom = r.set_mask(-999.0);
        assert_eq!(custom.mask_gt(2.0).data(), vec![-999.0, -999.0, 3.0, 4.0]);
        assert_eq!(custom.num_variables(), 2);
        // The receiver keeps the default mask value
        assert_eq!(r.mask_gt(2.0).data(), vec![0.0, 0.0, 3.0, 4.0]);
    }

    #[test]
    fn test_statistics() {
        let r = record("temp", [1.0, 2.0, 3.0, 4.0]);

        assert_eq!(r.mean(&[]).unwrap().data(), vec![2.5]);
        assert_eq!(r.mean(&[0]).unwrap().data(), vec![2.0, 3.0]);
        assert_close(&r.std(&[1]).unwrap().data(), &[0.5, 0.5]);
        assert_close(&r.skew(&[]).unwrap().data(), &[0.0]);
        assert_close(&r.detrend(1).unwrap().data(), &[0.0; 4]);
        assert!(r.mean(&[5]).is_err());
    }

    #[test]
    fn test_broadcast_slice_and_resolution() {
        let r = record("temp", [1.0, 2.0, 3.0, 4.0]);

        let b = r.broadcast(&[3, 2, 2]).unwrap();
        assert_eq!(b.shape(), vec![3, 2, 2]);

        let s = r.slice(&[(1, 2)]).unwrap();
        assert_eq!(s.data(), vec![3.0, 4.0]);

        let reduced = r.reduce_resolution(2, f64::NAN).unwrap();
        assert_eq!(reduced.data(), vec![2.5]);

        let rect = r.reduce_rectangle_resolution(1, 2, f64::NAN).unwrap();
        assert_eq!(rect.data(), vec![1.5, 3.5]);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut original = record("temp", [1.0, 2.0, 3.0, 4.0]);
        original.insert_variable("precip", grid([9.0; 4]));

        let mut copy = original.copy();
        assert_eq!(copy, original);
        assert!(!Arc::ptr_eq(
            copy.variable_handle("temp").unwrap(),
            original.variable_handle("temp").unwrap()
        ));
        // Siblings are shared, not copied
        assert!(Arc::ptr_eq(
            copy.variable_handle("precip").unwrap(),
            original.variable_handle("precip").unwrap()
        ));

        copy.tensor_mut().add_assign_scalar(100.0);
        assert_eq!(original.data(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(copy.data(), vec![101.0, 102.0, 103.0, 104.0]);
    }

    #[test]
    fn test_equality_ignores_cursor() {
        let mut a = record("temp", [1.0; 4]);
        a.insert_variable("precip", grid([2.0; 4]));
        let mut b = a.clone();
        b.select_variable("precip");

        assert_ne!(a.variable_in_use(), b.variable_in_use());
        assert_eq!(a, b);

        b.insert_metadata([("units", "mm")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_serialize_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage_config = StorageConfig {
            base_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let storage = Arc::new(LocalStorage::new(&storage_config).unwrap());
        let writer = ArchiveWriter::new(storage.clone(), ArchiveConfig::default());
        let reader = ArchiveReader::new(storage);

        let mut r = TensorRecord::with_metadata("temp", grid([1.0, 2.0, 3.0, 4.0]), [("units", "K")]);
        r.insert_variable("offset", DenseTensor::zeros(&[3]));
        r.serialize(&writer, "out/record.scta").unwrap();

        let archive = reader.read(Path::new("out/record.scta")).unwrap();
        assert_eq!(archive.field_names(), vec!["temp", "offset"]);
        assert_eq!(archive.field("offset").unwrap().shape, vec![3]);
        assert_eq!(archive.attributes.get("units").map(String::as_str), Some("K"));

        let loaded: TensorRecord<DenseTensor> = TensorRecord::from_archive(&archive).unwrap();
        assert_eq!(loaded, r);
    }

    #[test]
    fn test_from_empty_archive() {
        let err = TensorRecord::<DenseTensor>::from_archive(&Archive::default()).unwrap_err();
        assert!(matches!(err, TensorError::Archive { .. }));
    }
}
