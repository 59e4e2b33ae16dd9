// scitensor-core/src/dataset/iterator.rs

use std::sync::Arc;

use crate::error::{Result, TensorError};
use crate::record::TensorRecord;
use crate::tensor::Tensor;

use super::partition::Partition;
use super::source::{SourceDescriptor, SourceLoader};

/// Load one source and wrap `variable` as a single-variable record with
/// empty metadata.
///
/// The result depends only on `(source, variable)` and the loader's view
/// of the source, which is what makes re-running a partition safe.
pub fn produce_record<T: Tensor>(
    loader: &dyn SourceLoader<T>,
    source: &SourceDescriptor,
    variable: &str,
) -> Result<TensorRecord<T>> {
    let handle = loader.open(source)?;
    let tensor = handle.extract_variable(variable).map_err(|e| {
        if matches!(e, TensorError::VariableNotFound { .. }) {
            tracing::warn!(
                source = %source,
                variable,
                available = ?handle.variable_names(),
                "variable not found in source"
            );
        }
        e
    })?;
    Ok(TensorRecord::new(variable, tensor))
}

/// Forward-only iterator over the records of one partition.
///
/// Sources are loaded lazily, one at a time, in partition order. A source
/// that fails to load yields an error for that position and iteration
/// moves on to the next source.
pub struct PartitionIterator<T: Tensor> {
    loader: Arc<dyn SourceLoader<T>>,
    partition: Partition,
    variable: String,
    position: usize,
}

impl<T: Tensor> PartitionIterator<T> {
    pub fn new(
        loader: Arc<dyn SourceLoader<T>>,
        partition: Partition,
        variable: impl Into<String>,
    ) -> Self {
        Self {
            loader,
            partition,
            variable: variable.into(),
            position: 0,
        }
    }

    /// Produce the next record.
    ///
    /// Returns `Ok(None)` once every source in the partition has been
    /// visited.
    pub fn next_record(&mut self) -> Result<Option<TensorRecord<T>>> {
        let source = match self.partition.sources().get(self.position) {
            Some(source) => source.clone(),
            None => return Ok(None),
        };
        self.position += 1;

        tracing::debug!(
            partition = self.partition.index(),
            position = self.position - 1,
            source = %source,
            variable = %self.variable,
            loader = self.loader.name(),
            "loading dataset source"
        );

        produce_record(self.loader.as_ref(), &source, &self.variable).map(Some)
    }

    /// Restart production from the first source.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Fraction of sources visited, between 0.0 and 1.0.
    pub fn progress(&self) -> f64 {
        if self.partition.is_empty() {
            return 1.0;
        }
        self.position as f64 / self.partition.len() as f64
    }

    /// Number of sources visited so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn variable_name(&self) -> &str {
        &self.variable
    }
}

impl<T: Tensor> Iterator for PartitionIterator<T> {
    type Item = Result<TensorRecord<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.partition.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl<T: Tensor> ExactSizeIterator for PartitionIterator<T> {}
