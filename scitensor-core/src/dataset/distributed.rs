// scitensor-core/src/dataset/distributed.rs

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, TensorError};
use crate::record::TensorRecord;
use crate::tensor::Tensor;

use super::iterator::PartitionIterator;
use super::partition::{partition_sources, Partition};
use super::source::{SourceDescriptor, SourceLoader};

/// A lazily evaluated, partitioned collection of tensor records.
///
/// The dataset stores only its lineage: the ordered sources, the variable
/// to extract and the partition size. Records are produced on demand by
/// [`compute`](Self::compute) and are never cached, so any partition can be
/// recomputed from scratch after a failure.
pub struct TensorDataset<T: Tensor> {
    name: String,
    loader: Arc<dyn SourceLoader<T>>,
    sources: Vec<SourceDescriptor>,
    variable: String,
    partition_size: usize,
    partitions: Vec<Partition>,
}

impl<T: Tensor> TensorDataset<T> {
    /// Create a dataset over `sources`, extracting `variable` from each.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `partition_size` is 0.
    pub fn new<I, S>(
        loader: Arc<dyn SourceLoader<T>>,
        sources: I,
        variable: impl Into<String>,
        partition_size: usize,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SourceDescriptor>,
    {
        let sources: Vec<SourceDescriptor> = sources.into_iter().map(Into::into).collect();
        let variable = variable.into();
        let partitions = partition_sources(&sources, partition_size)?;

        tracing::info!(
            variable = %variable,
            sources = sources.len(),
            partitions = partitions.len(),
            loader = loader.name(),
            "created tensor dataset"
        );

        Ok(Self {
            name: variable.clone(),
            loader,
            sources,
            variable,
            partition_size,
            partitions,
        })
    }

    /// Set a display name for the dataset (defaults to the variable name).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn variable_name(&self) -> &str {
        &self.variable
    }

    pub fn partition_size(&self) -> usize {
        self.partition_size
    }

    pub fn loader(&self) -> &Arc<dyn SourceLoader<T>> {
        &self.loader
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> u32 {
        self.partitions.len() as u32
    }

    pub fn partition(&self, index: u32) -> Result<&Partition> {
        self.partitions
            .get(index as usize)
            .ok_or_else(|| TensorError::invalid_partition(index, self.num_partitions()))
    }

    /// Start producing the records of partition `index`.
    pub fn compute(&self, index: u32) -> Result<PartitionIterator<T>> {
        let partition = self.partition(index)?.clone();
        Ok(PartitionIterator::new(
            self.loader.clone(),
            partition,
            self.variable.clone(),
        ))
    }

    /// Derive the partitioning again from the lineage.
    ///
    /// The result always equals [`partitions`](Self::partitions).
    pub fn recompute_partitions(&self) -> Result<Vec<Partition>> {
        partition_sources(&self.sources, self.partition_size)
    }

    /// Every record, partition by partition in index order.
    pub fn iter(&self) -> impl Iterator<Item = Result<TensorRecord<T>>> + '_ {
        self.partitions.iter().flat_map(move |partition| {
            PartitionIterator::new(self.loader.clone(), partition.clone(), self.variable.clone())
        })
    }

    /// Materialize every record, stopping at the first failure.
    pub fn collect(&self) -> Result<Vec<TensorRecord<T>>> {
        self.iter().collect()
    }
}

impl<T: Tensor> fmt::Debug for TensorDataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorDataset")
            .field("name", &self.name)
            .field("variable", &self.variable)
            .field("sources", &self.sources.len())
            .field("partitions", &self.partitions.len())
            .field("loader", &self.loader.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::loader::MemoryLoader;
    use crate::tensor::DenseTensor;

    fn grid(values: [f64; 4]) -> DenseTensor {
        DenseTensor::from_shape_vec(&[2, 2], values.to_vec()).unwrap()
    }

    fn two_source_loader() -> Arc<dyn SourceLoader<DenseTensor>> {
        Arc::new(
            MemoryLoader::new()
                .with_source("a.scta", TensorRecord::new("temp", grid([1.0, 2.0, 3.0, 4.0])))
                .with_source("b.scta", TensorRecord::new("temp", grid([5.0, 6.0, 7.0, 8.0]))),
        )
    }

    #[test]
    fn test_end_to_end_sum() {
        let dataset = TensorDataset::new(two_source_loader(), ["a.scta", "b.scta"], "temp", 1).unwrap();
        assert_eq!(dataset.num_partitions(), 2);

        let mut records = Vec::new();
        for index in 0..dataset.num_partitions() {
            let produced: Vec<_> = dataset.compute(index).unwrap().collect::<Result<_>>().unwrap();
            assert_eq!(produced.len(), 1);
            records.extend(produced);
        }

        let sum = (&records[0] + &records[1]).unwrap();
        assert_eq!(sum.shape(), vec![2, 2]);
        assert_eq!(sum.data(), vec![6.0, 8.0, 10.0, 12.0]);
    }

    #[test]
    fn test_metadata_accessors() {
        let dataset = TensorDataset::new(two_source_loader(), ["a.scta", "b.scta"], "temp", 2)
            .unwrap()
            .with_name("surface-temp");

        assert_eq!(dataset.name(), "surface-temp");
        assert_eq!(dataset.variable_name(), "temp");
        assert_eq!(dataset.partition_size(), 2);
        assert_eq!(dataset.sources().len(), 2);
        assert_eq!(dataset.num_partitions(), 1);
        assert_eq!(dataset.partition(0).unwrap().len(), 2);
        assert!(format!("{dataset:?}").contains("surface-temp"));
    }

    #[test]
    fn test_invalid_partition() {
        let dataset = TensorDataset::new(two_source_loader(), ["a.scta", "b.scta"], "temp", 1).unwrap();

        let err = dataset.compute(5).err().unwrap();
        assert!(matches!(err, TensorError::InvalidPartition { index: 5, total: 2 }));
    }

    #[test]
    fn test_zero_partition_size() {
        let result = TensorDataset::new(two_source_loader(), ["a.scta"], "temp", 0);
        assert!(matches!(result, Err(TensorError::Config { .. })));
    }

    #[test]
    fn test_recompute_partitions_matches() {
        let sources: Vec<String> = (0..9).map(|i| format!("g{i}.scta")).collect();
        let dataset = TensorDataset::new(two_source_loader(), sources, "temp", 4).unwrap();

        assert_eq!(dataset.recompute_partitions().unwrap(), dataset.partitions());
    }

    #[test]
    fn test_recompute_partition_records() {
        let dataset = TensorDataset::new(two_source_loader(), ["a.scta", "b.scta"], "temp", 2).unwrap();

        let first: Vec<_> = dataset.compute(0).unwrap().collect::<Result<_>>().unwrap();
        let again: Vec<_> = dataset.compute(0).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_iter_and_collect_are_ordered() {
        let dataset = TensorDataset::new(two_source_loader(), ["b.scta", "a.scta"], "temp", 1).unwrap();

        let records = dataset.collect().unwrap();
        assert_eq!(records[0].data(), vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(records[1].data(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(dataset.iter().count(), 2);
    }

    #[test]
    fn test_collect_surfaces_load_error() {
        let dataset = TensorDataset::new(two_source_loader(), ["a.scta", "nope.scta"], "temp", 1).unwrap();
        assert!(matches!(dataset.collect(), Err(TensorError::Load { .. })));
    }
}
