// scitensor-core/src/archive/mod.rs

//! Record archives: named `f32` arrays plus string attributes in a single
//! checksummed, optionally compressed file.
//!
//! Archives are what [`TensorRecord::serialize`](crate::record::TensorRecord::serialize)
//! produces and what [`ArchiveLoader`](crate::dataset::ArchiveLoader) reads
//! as dataset sources.

mod format;
mod reader;
mod writer;

pub use format::{Archive, ArchiveField, ArchiveHeader, FieldSpec};
pub use reader::{decode, ArchiveReader};
pub use writer::ArchiveWriter;
