// scitensor-core/src/dataset/partition.rs

use std::sync::Arc;

use crate::error::{Result, TensorError};

use super::source::SourceDescriptor;

/// An ordered group of sources assigned to one unit of parallel work.
///
/// Partitions are only built by [`partition_sources`] and never change
/// afterwards; cloning one shares its source list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    index: u32,
    sources: Arc<[SourceDescriptor]>,
}

impl Partition {
    pub(crate) fn new(index: u32, sources: Vec<SourceDescriptor>) -> Self {
        Self {
            index,
            sources: sources.into(),
        }
    }

    /// Position of this partition in the dataset's partition sequence
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Group `sources` into consecutive partitions of `group_size` sources each.
///
/// Grouping keeps the original source order and the last partition may be
/// shorter. The result depends only on the arguments, so calling this again
/// with the same lineage reproduces the same assignment.
///
/// # Errors
///
/// Returns a configuration error if `group_size` is 0.
pub fn partition_sources(sources: &[SourceDescriptor], group_size: usize) -> Result<Vec<Partition>> {
    if group_size == 0 {
        return Err(TensorError::config("partition size must be greater than 0"));
    }

    let total = sources.len().div_ceil(group_size);
    if u32::try_from(total).is_err() {
        return Err(TensorError::config(format!(
            "{total} partitions exceed the supported maximum of {}",
            u32::MAX
        )));
    }

    Ok(sources
        .chunks(group_size)
        .enumerate()
        .map(|(index, chunk)| Partition::new(index as u32, chunk.to_vec()))
        .collect())
}
