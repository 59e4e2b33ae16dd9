// scitensor-core/src/dataset/parallel.rs

//! Parallel partition loading.
//!
//! Partitions share no mutable state, so each one can be produced on its
//! own worker thread. Records from every worker are funneled into a single
//! bounded channel; ordering across partitions is not preserved unless the
//! caller uses [`ParallelPartitionLoader::load_all`], which sorts.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver};

use super::distributed::TensorDataset;
use super::iterator::produce_record;
use super::partition::Partition;
use super::source::{SourceDescriptor, SourceLoader};
use crate::config::PerformanceConfig;
use crate::error::{Result, TensorError};
use crate::record::TensorRecord;
use crate::tensor::Tensor;

/// Configuration for parallel partition loading.
#[derive(Debug, Clone)]
pub struct ParallelLoadConfig {
    /// Number of worker threads.
    pub parallelism: usize,
    /// Channel slots per worker.
    pub channel_buffer: usize,
}

impl Default for ParallelLoadConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            channel_buffer: 4,
        }
    }
}

impl From<&PerformanceConfig> for ParallelLoadConfig {
    fn from(config: &PerformanceConfig) -> Self {
        Self {
            parallelism: config.parallelism,
            channel_buffer: config.channel_buffer,
        }
    }
}

/// A record tagged with where it came from.
#[derive(Debug, Clone)]
pub struct RecordWithPartition<T: Tensor> {
    pub record: TensorRecord<T>,
    /// Index of the partition that produced the record.
    pub partition: u32,
    /// Position of the source within its partition.
    pub position: usize,
    /// The worker thread that loaded the record.
    pub worker_id: u32,
}

/// Produces several partitions concurrently on worker threads.
pub struct ParallelPartitionLoader<T: Tensor> {
    config: ParallelLoadConfig,
    loader: Arc<dyn SourceLoader<T>>,
    variable: String,
}

impl<T: Tensor> ParallelPartitionLoader<T> {
    pub fn new(
        loader: Arc<dyn SourceLoader<T>>,
        variable: impl Into<String>,
        config: ParallelLoadConfig,
    ) -> Self {
        Self {
            config,
            loader,
            variable: variable.into(),
        }
    }

    /// Loader that produces the partitions of `dataset`.
    pub fn for_dataset(dataset: &TensorDataset<T>, config: ParallelLoadConfig) -> Self {
        Self::new(dataset.loader().clone(), dataset.variable_name(), config)
    }

    pub fn config(&self) -> &ParallelLoadConfig {
        &self.config
    }

    /// Start loading `partitions` and return the receiving end of the
    /// record stream.
    ///
    /// Partitions are split into contiguous groups, one per worker. A source
    /// that fails to load, or whose loader panics, is sent down the channel
    /// as an error for its position and the partition carries on with the
    /// next source. Dropping the receiver stops every worker at its next
    /// send.
    pub fn load_partitions(&self, partitions: Vec<Partition>) -> Receiver<Result<RecordWithPartition<T>>> {
        let parallelism = self.config.parallelism.max(1).min(partitions.len().max(1));
        let (tx, rx) = channel::bounded(self.config.channel_buffer.max(1) * parallelism);

        if partitions.is_empty() {
            return rx;
        }

        let partitions_per_worker = partitions.len().div_ceil(parallelism);

        for (worker_id, chunk) in partitions.chunks(partitions_per_worker).enumerate() {
            let tx = tx.clone();
            let loader = self.loader.clone();
            let variable = self.variable.clone();
            let worker_partitions = chunk.to_vec();
            let worker_id = worker_id as u32;

            thread::spawn(move || {
                for partition in worker_partitions {
                    let index = partition.index();

                    for (position, source) in partition.sources().iter().enumerate() {
                        tracing::debug!(worker_id, partition = index, position, source = %source, "loading source");

                        let item = load_guarded(loader.as_ref(), source, &variable).map(|record| {
                            RecordWithPartition {
                                record,
                                partition: index,
                                position,
                                worker_id,
                            }
                        });

                        if tx.send(item).is_err() {
                            tracing::warn!(worker_id, partition = index, "record receiver dropped, stopping worker");
                            return;
                        }
                    }
                }
            });
        }

        rx
    }

    /// Load every partition and return the records sorted by
    /// `(partition, position)`.
    ///
    /// Fails with the first error received.
    pub fn load_all(&self, partitions: Vec<Partition>) -> Result<Vec<RecordWithPartition<T>>> {
        let rx = self.load_partitions(partitions);
        let mut records = Vec::new();

        for result in rx {
            records.push(result?);
        }

        records.sort_by_key(|r| (r.partition, r.position));
        Ok(records)
    }
}

/// Produce one record, reporting a panic inside the loader as a load error
/// for that source.
fn load_guarded<T: Tensor>(
    loader: &dyn SourceLoader<T>,
    source: &SourceDescriptor,
    variable: &str,
) -> Result<TensorRecord<T>> {
    panic::catch_unwind(AssertUnwindSafe(|| produce_record(loader, source, variable))).unwrap_or_else(
        |payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!(source = %source, %message, "loader panicked");
            Err(TensorError::load(source.as_str(), format!("loader panicked: {message}")))
        },
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
