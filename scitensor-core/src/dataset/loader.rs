// scitensor-core/src/dataset/loader.rs

//! Built-in [`SourceLoader`] implementations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::archive::{Archive, ArchiveReader};
use crate::error::{Result, TensorError};
use crate::record::TensorRecord;
use crate::storage::StorageBackend;
use crate::tensor::Tensor;

use super::source::{DatasetHandle, SourceDescriptor, SourceLoader};

/// Loads sources stored as record archives.
///
/// Descriptors are storage paths, resolved by the backend.
pub struct ArchiveLoader {
    reader: ArchiveReader,
}

impl ArchiveLoader {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            reader: ArchiveReader::new(storage),
        }
    }
}

impl<T: Tensor> SourceLoader<T> for ArchiveLoader {
    fn open(&self, source: &SourceDescriptor) -> Result<Box<dyn DatasetHandle<T>>> {
        let archive = self
            .reader
            .read(source.as_path())
            .map_err(|e| TensorError::load_with_source(source.as_str(), e.to_string(), e))?;

        Ok(Box::new(ArchiveHandle {
            descriptor: source.clone(),
            archive,
        }))
    }

    fn name(&self) -> &'static str {
        "archive"
    }
}

struct ArchiveHandle {
    descriptor: SourceDescriptor,
    archive: Archive,
}

impl<T: Tensor> DatasetHandle<T> for ArchiveHandle {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn variable_names(&self) -> Vec<String> {
        self.archive.field_names()
    }

    fn extract_variable(&self, name: &str) -> Result<T> {
        let field = self
            .archive
            .field(name)
            .ok_or_else(|| TensorError::variable_not_found(name, self.descriptor.as_str()))?;
        let values = field.values.iter().map(|&v| f64::from(v)).collect();
        T::from_shape_vec(&field.shape, values)
    }
}

/// Serves sources from records held in memory.
///
/// Useful for tests and for pipelines whose inputs are produced in-process.
pub struct MemoryLoader<T: Tensor> {
    sources: HashMap<SourceDescriptor, TensorRecord<T>>,
}

impl<T: Tensor> MemoryLoader<T> {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Registers `record` as the contents of `descriptor`, replacing any
    /// previous entry.
    pub fn insert(&mut self, descriptor: impl Into<SourceDescriptor>, record: TensorRecord<T>) {
        self.sources.insert(descriptor.into(), record);
    }

    pub fn with_source(
        mut self,
        descriptor: impl Into<SourceDescriptor>,
        record: TensorRecord<T>,
    ) -> Self {
        self.insert(descriptor, record);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<T: Tensor> Default for MemoryLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tensor> SourceLoader<T> for MemoryLoader<T> {
    fn open(&self, source: &SourceDescriptor) -> Result<Box<dyn DatasetHandle<T>>> {
        let record = self
            .sources
            .get(source)
            .ok_or_else(|| TensorError::load(source.as_str(), "no such in-memory source"))?;

        Ok(Box::new(MemoryHandle {
            descriptor: source.clone(),
            record: record.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryHandle<T: Tensor> {
    descriptor: SourceDescriptor,
    record: TensorRecord<T>,
}

impl<T: Tensor> DatasetHandle<T> for MemoryHandle<T> {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn variable_names(&self) -> Vec<String> {
        self.record.variable_names().map(str::to_string).collect()
    }

    fn extract_variable(&self, name: &str) -> Result<T> {
        self.record
            .variable(name)
            .cloned()
            .ok_or_else(|| TensorError::variable_not_found(name, self.descriptor.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;
    use crate::config::{ArchiveConfig, StorageConfig};
    use crate::storage::LocalStorage;
    use crate::tensor::DenseTensor;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn grid(values: [f64; 4]) -> DenseTensor {
        DenseTensor::from_shape_vec(&[2, 2], values.to_vec()).unwrap()
    }

    fn create_storage() -> (Arc<LocalStorage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            base_path: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        (Arc::new(LocalStorage::new(&config).unwrap()), temp_dir)
    }

    #[test]
    fn test_archive_loader_extracts_variable() {
        let (storage, _temp) = create_storage();
        let writer = ArchiveWriter::new(storage.clone(), ArchiveConfig::default());
        let mut record = TensorRecord::new("temp", grid([1.0, 2.0, 3.0, 4.0]));
        record.insert_variable("precip", DenseTensor::zeros(&[3]));
        record.serialize(&writer, "a.scta").unwrap();

        let loader = ArchiveLoader::new(storage);
        let source = SourceDescriptor::from("a.scta");
        let handle: Box<dyn DatasetHandle<DenseTensor>> = loader.open(&source).unwrap();

        assert_eq!(handle.descriptor(), &source);
        assert_eq!(handle.variable_names(), vec!["temp", "precip"]);
        let temp = handle.extract_variable("temp").unwrap();
        assert_eq!(temp, grid([1.0, 2.0, 3.0, 4.0]));

        let err = handle.extract_variable("wind").unwrap_err();
        assert!(matches!(err, TensorError::VariableNotFound { .. }));
    }

    #[test]
    fn test_archive_loader_missing_source() {
        let (storage, _temp) = create_storage();
        let loader = ArchiveLoader::new(storage);

        let result: Result<Box<dyn DatasetHandle<DenseTensor>>> =
            loader.open(&SourceDescriptor::from("missing.scta"));
        match result {
            Err(TensorError::Load { descriptor, .. }) => assert_eq!(descriptor, "missing.scta"),
            other => panic!("expected load error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_archive_loader_corrupt_source() {
        let (storage, _temp) = create_storage();
        let mut out = storage.open_write(Path::new("junk.scta")).unwrap();
        out.write_all(b"definitely not an archive").unwrap();
        out.finish().unwrap();

        let loader = ArchiveLoader::new(storage);
        let result: Result<Box<dyn DatasetHandle<DenseTensor>>> =
            loader.open(&SourceDescriptor::from("junk.scta"));
        assert!(matches!(result, Err(TensorError::Load { .. })));
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new()
            .with_source("a", TensorRecord::new("temp", grid([1.0; 4])))
            .with_source("b", TensorRecord::new("temp", grid([2.0; 4])));
        assert_eq!(loader.len(), 2);

        let handle = loader.open(&"b".into()).unwrap();
        assert_eq!(handle.variable_names(), vec!["temp"]);
        assert_eq!(handle.extract_variable("temp").unwrap(), grid([2.0; 4]));
        assert!(matches!(
            handle.extract_variable("precip"),
            Err(TensorError::VariableNotFound { .. })
        ));

        assert!(matches!(
            loader.open(&"c".into()),
            Err(TensorError::Load { .. })
        ));
    }
}
