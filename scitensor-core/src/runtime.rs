// scitensor-core/src/runtime.rs

//! Runtime wiring.
//!
//! [`Runtime`] builds the storage backend and archive reader/writer from a
//! [`RuntimeConfig`] and hands out datasets and record persistence on top of
//! them.
//!
//! # Example
//!
//! ```no_run
//! use scitensor_core::Runtime;
//!
//! let runtime = Runtime::new().unwrap();
//!
//! // One partition per archive by default
//! let dataset = runtime
//!     .register_dataset(["2020/temp.scta", "2021/temp.scta"], "temp")
//!     .unwrap();
//!
//! let records = dataset.collect().unwrap();
//! let mut total = records[0].clone();
//! for record in &records[1..] {
//!     total = (&total + record).unwrap();
//! }
//!
//! runtime.save_record(&total.mean(&[]).unwrap(), "summary/temp_mean.scta").unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::archive::{ArchiveReader, ArchiveWriter};
use crate::config::RuntimeConfig;
use crate::dataset::{
    ArchiveLoader, ParallelLoadConfig, ParallelPartitionLoader, SourceDescriptor, SourceLoader,
    TensorDataset,
};
use crate::error::{Result, TensorError};
use crate::record::TensorRecord;
use crate::storage::{LocalStorage, StorageBackend};
use crate::tensor::{DenseTensor, Tensor};

/// Owns the storage backend and archive I/O shared by datasets and records.
pub struct Runtime {
    config: RuntimeConfig,
    storage: Arc<dyn StorageBackend>,
    archive_writer: ArchiveWriter,
    archive_reader: ArchiveReader,
}

impl Runtime {
    /// Creates a runtime with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::from_config(RuntimeConfig::default())
    }

    /// Creates a runtime from a TOML configuration file, with `SCT_`
    /// environment overrides applied on top.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = RuntimeConfig::from_file(path)?.with_env_overrides();
        Self::from_config(config)
    }

    /// Creates a runtime from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the storage
    /// backend cannot be initialized.
    pub fn from_config(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;

        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(&config.storage)?);
        let archive_writer = ArchiveWriter::new(storage.clone(), config.archive.clone());
        let archive_reader = ArchiveReader::new(storage.clone());

        Ok(Self {
            config,
            storage,
            archive_writer,
            archive_reader,
        })
    }

    /// Registers a dataset over record archives in this runtime's storage.
    ///
    /// Sources are partitioned using the configured `dataset.partition_size`.
    pub fn register_dataset<I, S>(
        &self,
        sources: I,
        variable: impl Into<String>,
    ) -> Result<TensorDataset<DenseTensor>>
    where
        I: IntoIterator<Item = S>,
        S: Into<SourceDescriptor>,
    {
        let loader: Arc<dyn SourceLoader<DenseTensor>> =
            Arc::new(ArchiveLoader::new(self.storage.clone()));
        self.register_dataset_with_loader(loader, sources, variable)
    }

    /// Registers a dataset whose sources are opened by `loader`.
    pub fn register_dataset_with_loader<T, I, S>(
        &self,
        loader: Arc<dyn SourceLoader<T>>,
        sources: I,
        variable: impl Into<String>,
    ) -> Result<TensorDataset<T>>
    where
        T: Tensor,
        I: IntoIterator<Item = S>,
        S: Into<SourceDescriptor>,
    {
        TensorDataset::new(loader, sources, variable, self.config.dataset.partition_size)
    }

    /// Writes `record` as an archive at `path`.
    pub fn save_record<T: Tensor>(
        &self,
        record: &TensorRecord<T>,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        record.serialize(&self.archive_writer, path)
    }

    /// Reads a record archive, optionally moving the cursor to `variable`.
    ///
    /// Unlike [`TensorRecord::select_variable`], asking for a variable the
    /// archive doesn't contain is an error.
    pub fn load_record<T: Tensor>(
        &self,
        path: impl AsRef<Path>,
        variable: Option<&str>,
    ) -> Result<TensorRecord<T>> {
        let path = path.as_ref();
        let archive = self.archive_reader.read(path)?;
        let mut record = TensorRecord::from_archive(&archive)?;

        if let Some(name) = variable {
            if !record.contains_variable(name) {
                return Err(TensorError::variable_not_found(
                    name,
                    path.display().to_string(),
                ));
            }
            record.select_variable(name);
        }

        Ok(record)
    }

    /// Parallel loader for `dataset`, sized by the `performance` section.
    pub fn parallel_loader<T: Tensor>(
        &self,
        dataset: &TensorDataset<T>,
    ) -> ParallelPartitionLoader<T> {
        let config = ParallelLoadConfig::from(&self.config.performance);
        ParallelPartitionLoader::for_dataset(dataset, config)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_LOCK;
    use crate::dataset::MemoryLoader;
    use std::io::Write;
    use tempfile::TempDir;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn create_test_runtime(partition_size: usize) -> (Runtime, TempDir) {
        init_tracing();
        let temp_dir = TempDir::new().unwrap();

        let mut config = RuntimeConfig::default();
        config.storage.base_path = temp_dir.path().to_path_buf();
        config.dataset.partition_size = partition_size;

        let runtime = Runtime::from_config(config).unwrap();
        (runtime, temp_dir)
    }

    fn grid(values: [f64; 4]) -> DenseTensor {
        DenseTensor::from_shape_vec(&[2, 2], values.to_vec()).unwrap()
    }

    fn write_sources(runtime: &Runtime) {
        runtime
            .save_record(&TensorRecord::new("temp", grid([1.0, 2.0, 3.0, 4.0])), "granules/a.scta")
            .unwrap();
        runtime
            .save_record(&TensorRecord::new("temp", grid([5.0, 6.0, 7.0, 8.0])), "granules/b.scta")
            .unwrap();
    }

    #[test]
    fn test_runtime_from_config() {
        let (runtime, temp) = create_test_runtime(1);
        assert_eq!(runtime.config().storage.base_path, temp.path());
        assert!(runtime.storage().exists(Path::new("")).unwrap());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = RuntimeConfig::default();
        config.storage.base_path = temp_dir.path().to_path_buf();
        config.performance.parallelism = 0;

        assert!(matches!(
            Runtime::from_config(config),
            Err(TensorError::Config { .. })
        ));
    }

    #[test]
    fn test_register_dataset_end_to_end() {
        let (runtime, _temp) = create_test_runtime(1);
        write_sources(&runtime);

        let dataset = runtime
            .register_dataset(["granules/a.scta", "granules/b.scta"], "temp")
            .unwrap();
        assert_eq!(dataset.num_partitions(), 2);

        let mut records = Vec::new();
        for index in 0..dataset.num_partitions() {
            let mut iter = dataset.compute(index).unwrap();
            records.push(iter.next_record().unwrap().unwrap());
            assert!(iter.next_record().unwrap().is_none());
        }

        let sum = (&records[0] + &records[1]).unwrap();
        assert_eq!(sum.shape(), vec![2, 2]);
        assert_eq!(sum.data(), vec![6.0, 8.0, 10.0, 12.0]);
    }

    #[test]
    fn test_register_dataset_uses_partition_size() {
        let (runtime, _temp) = create_test_runtime(2);
        write_sources(&runtime);

        let dataset = runtime
            .register_dataset(["granules/a.scta", "granules/b.scta"], "temp")
            .unwrap();
        assert_eq!(dataset.num_partitions(), 1);
        assert_eq!(dataset.partition(0).unwrap().len(), 2);
        assert_eq!(dataset.collect().unwrap().len(), 2);
    }

    #[test]
    fn test_register_dataset_missing_variable() {
        let (runtime, _temp) = create_test_runtime(1);
        write_sources(&runtime);

        let dataset = runtime.register_dataset(["granules/a.scta"], "precip").unwrap();
        let err = dataset.collect().unwrap_err();
        assert!(matches!(err, TensorError::VariableNotFound { .. }));
    }

    #[test]
    fn test_register_dataset_with_loader() {
        let (runtime, _temp) = create_test_runtime(1);
        let loader: Arc<dyn SourceLoader<DenseTensor>> = Arc::new(
            MemoryLoader::new().with_source("mem://a", TensorRecord::new("temp", grid([1.0; 4]))),
        );

        let dataset = runtime
            .register_dataset_with_loader(loader, ["mem://a"], "temp")
            .unwrap();
        assert_eq!(dataset.collect().unwrap()[0].data(), vec![1.0; 4]);
    }

    #[test]
    fn test_save_and_load_record() {
        let (runtime, _temp) = create_test_runtime(1);

        let mut record = TensorRecord::with_metadata(
            "temp",
            grid([1.0, 2.0, 3.0, 4.0]),
            [("units", "K"), ("model", "era5")],
        );
        record.insert_variable("precip", DenseTensor::zeros(&[3]));
        runtime.save_record(&record, "out/record.scta").unwrap();

        let loaded: TensorRecord<DenseTensor> = runtime.load_record("out/record.scta", None).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.variable_in_use(), "temp");

        let precip: TensorRecord<DenseTensor> =
            runtime.load_record("out/record.scta", Some("precip")).unwrap();
        assert_eq!(precip.variable_in_use(), "precip");
        assert_eq!(precip.shape(), vec![3]);

        let err = runtime
            .load_record::<DenseTensor>("out/record.scta", Some("wind"))
            .unwrap_err();
        assert!(matches!(err, TensorError::VariableNotFound { .. }));
    }

    #[test]
    fn test_load_missing_record() {
        let (runtime, _temp) = create_test_runtime(1);
        let err = runtime
            .load_record::<DenseTensor>("nope.scta", None)
            .unwrap_err();
        assert!(matches!(err, TensorError::Storage { .. }));
    }

    #[test]
    fn test_parallel_loader() {
        let (runtime, _temp) = create_test_runtime(1);
        write_sources(&runtime);

        let dataset = runtime
            .register_dataset(["granules/a.scta", "granules/b.scta"], "temp")
            .unwrap();
        let loader = runtime.parallel_loader(&dataset);
        assert_eq!(loader.config().parallelism, runtime.config().performance.parallelism);

        let records = loader.load_all(dataset.partitions().to_vec()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].partition, 0);
        assert_eq!(records[1].record.data(), vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_config_file_loading() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = TempDir::new().unwrap();

        let config_content = format!(
            r#"
            [storage]
            base_path = "{}"
            buffer_size = 32768

            [dataset]
            partition_size = 3

            [archive]
            compression = "zstd"
            "#,
            temp_dir.path().display()
        );

        let config_path = temp_dir.path().join("config.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let runtime = Runtime::from_config_file(&config_path).unwrap();

        assert_eq!(runtime.config().storage.buffer_size, 32768);
        assert_eq!(runtime.config().dataset.partition_size, 3);
        assert_eq!(runtime.config().archive.compression, "zstd");
    }
}
