// scitensor-core/src/dataset/mod.rs

//! Partitioned, lazily produced datasets of tensor records.
//!
//! A [`TensorDataset`] is a recipe: an ordered list of sources, the variable
//! to extract from each, and a partition size. Each partition's records are
//! produced on demand by a [`PartitionIterator`] through a [`SourceLoader`],
//! and can be produced again at any time with identical output.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use scitensor_core::dataset::{MemoryLoader, SourceLoader, TensorDataset};
//! use scitensor_core::{DenseTensor, Tensor, TensorRecord};
//!
//! let grid = |v: [f64; 4]| DenseTensor::from_shape_vec(&[2, 2], v.to_vec()).unwrap();
//! let loader: Arc<dyn SourceLoader<DenseTensor>> = Arc::new(
//!     MemoryLoader::new()
//!         .with_source("a.scta", TensorRecord::new("temp", grid([1.0, 2.0, 3.0, 4.0])))
//!         .with_source("b.scta", TensorRecord::new("temp", grid([5.0, 6.0, 7.0, 8.0]))),
//! );
//!
//! let dataset = TensorDataset::new(loader, ["a.scta", "b.scta"], "temp", 1).unwrap();
//! assert_eq!(dataset.num_partitions(), 2);
//!
//! for record in dataset.compute(1).unwrap() {
//!     assert_eq!(record.unwrap().data(), vec![5.0, 6.0, 7.0, 8.0]);
//! }
//! ```

mod distributed;
mod iterator;
mod loader;
mod parallel;
mod partition;
mod source;

pub use distributed::TensorDataset;
pub use iterator::{produce_record, PartitionIterator};
pub use loader::{ArchiveLoader, MemoryLoader};
pub use parallel::{ParallelLoadConfig, ParallelPartitionLoader, RecordWithPartition};
pub use partition::{partition_sources, Partition};
pub use source::{DatasetHandle, SourceDescriptor, SourceLoader};
