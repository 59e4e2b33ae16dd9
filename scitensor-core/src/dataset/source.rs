// scitensor-core/src/dataset/source.rs

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tensor::Tensor;

/// Opaque reference to one scientific dataset: a path, URL or key that a
/// [`SourceLoader`] knows how to open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceDescriptor(String);

impl SourceDescriptor {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The descriptor interpreted as a storage path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceDescriptor {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceDescriptor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Path> for SourceDescriptor {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for SourceDescriptor {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

/// Opens dataset sources.
///
/// Implementations must be side-effect free apart from reading the source:
/// opening the same descriptor twice yields the same data. Partition
/// recomputation relies on this.
pub trait SourceLoader<T: Tensor>: Send + Sync {
    /// Open a source, failing with [`TensorError::Load`] when it is
    /// unreachable or malformed.
    ///
    /// [`TensorError::Load`]: crate::error::TensorError::Load
    fn open(&self, source: &SourceDescriptor) -> Result<Box<dyn DatasetHandle<T>>>;

    /// Name of this loader, used in logs
    fn name(&self) -> &'static str;
}

/// An opened dataset source.
pub trait DatasetHandle<T: Tensor>: Send {
    fn descriptor(&self) -> &SourceDescriptor;

    fn variable_names(&self) -> Vec<String>;

    /// Extract a variable, failing with [`TensorError::VariableNotFound`]
    /// when the source has no such variable.
    ///
    /// [`TensorError::VariableNotFound`]: crate::error::TensorError::VariableNotFound
    fn extract_variable(&self, name: &str) -> Result<T>;
}
