// scitensor-core/src/lib.rs

//! SciTensor - Core Library
//!
//! Named-variable tensor records with record-level algebra, and lazily
//! produced, partitioned datasets of those records that can be recomputed
//! from their source list after a failure.

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::RuntimeConfig;
pub use error::{Result, TensorError};
pub use storage::{LocalStorage, StorageBackend, StorageReader, StorageWriter};

pub mod tensor;
pub use tensor::{Comparison, DenseTensor, Tensor};

pub mod record;
pub use record::TensorRecord;

pub mod archive;
pub use archive::{Archive, ArchiveField, ArchiveHeader, ArchiveReader, ArchiveWriter, FieldSpec};

pub mod dataset;
pub use dataset::{
    partition_sources, ArchiveLoader, DatasetHandle, MemoryLoader, ParallelLoadConfig,
    ParallelPartitionLoader, Partition, PartitionIterator, RecordWithPartition,
    SourceDescriptor, SourceLoader, TensorDataset,
};

pub mod runtime;
pub use runtime::Runtime;
