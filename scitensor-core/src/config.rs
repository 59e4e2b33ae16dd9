// scitensor-core/src/config.rs

//! Configuration management for tensor datasets.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, TensorError};

/// Compression algorithms accepted for archive payloads.
pub const VALID_COMPRESSION: [&str; 3] = ["none", "lz4", "zstd"];

// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub storage: StorageConfig,
    pub dataset: DatasetConfig,
    pub archive: ArchiveConfig,
    pub performance: PerformanceConfig,
}

// Storage configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    // Base path that relative source descriptors and archive paths resolve against.
    pub base_path: PathBuf,
    // Buffer size in bytes for I/O operations.
    pub buffer_size: usize,
    // Whether to use memory-mapped I/O.
    pub use_mmap: bool,
    // File size threshold (bytes) above which to use mmap.
    pub mmap_threshold: u64,
}

/// Dataset configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Number of sources grouped into one partition.
    pub partition_size: usize,
}

/// Archive (record serialization) options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Payload compression: "none", "lz4", or "zstd".
    pub compression: String,
    /// Compression level (zstd only).
    pub compression_level: i32,
    /// Write to a temporary file and rename into place.
    pub atomic_writes: bool,
}

/// Parallel partition loading options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Number of worker threads producing partitions concurrently.
    pub parallelism: usize,
    /// Bounded channel capacity per worker.
    pub channel_buffer: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./data"),
            buffer_size: 64 * 1024, // 64 KB
            use_mmap: true,
            mmap_threshold: 1024 * 1024, // 1 MB
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self { partition_size: 1 }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression: "none".to_string(),
            compression_level: 1,
            atomic_writes: true,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            channel_buffer: 4,
        }
    }
}

impl ArchiveConfig {
    /// Validate archive configuration.
    pub fn validate(&self) -> Result<()> {
        if !VALID_COMPRESSION.contains(&self.compression.as_str()) {
            return Err(TensorError::config(format!(
                "archive.compression must be one of: {}",
                VALID_COMPRESSION.join(", ")
            )));
        }
        Ok(())
    }
}

impl FromStr for RuntimeConfig {
    type Err = TensorError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| TensorError::config_with_source("failed to parse TOML config", e))
    }
}

impl RuntimeConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TensorError::storage_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `SCT_` and use underscores
    // to separate nested fields. For example:
    // - `SCT_STORAGE_BASE_PATH` overrides `storage.base_path`
    // - `SCT_DATASET_PARTITION_SIZE` overrides `dataset.partition_size`
    // - `SCT_ARCHIVE_COMPRESSION` overrides `archive.compression`
    // - `SCT_PERFORMANCE_PARALLELISM` overrides `performance.parallelism`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Storage overrides
        if let Ok(val) = std::env::var("SCT_STORAGE_BASE_PATH") {
            self.storage.base_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("SCT_STORAGE_BUFFER_SIZE") {
            if let Ok(v) = val.parse() {
                self.storage.buffer_size = v;
            }
        }
        if let Ok(val) = std::env::var("SCT_STORAGE_USE_MMAP") {
            if let Ok(v) = val.parse() {
                self.storage.use_mmap = v;
            }
        }
        if let Ok(val) = std::env::var("SCT_STORAGE_MMAP_THRESHOLD") {
            if let Ok(v) = val.parse() {
                self.storage.mmap_threshold = v;
            }
        }

        // Dataset overrides
        if let Ok(val) = std::env::var("SCT_DATASET_PARTITION_SIZE") {
            if let Ok(v) = val.parse() {
                self.dataset.partition_size = v;
            }
        }

        // Archive overrides
        if let Ok(val) = std::env::var("SCT_ARCHIVE_COMPRESSION") {
            self.archive.compression = val;
        }
        if let Ok(val) = std::env::var("SCT_ARCHIVE_COMPRESSION_LEVEL") {
            if let Ok(v) = val.parse() {
                self.archive.compression_level = v;
            }
        }
        if let Ok(val) = std::env::var("SCT_ARCHIVE_ATOMIC_WRITES") {
            if let Ok(v) = val.parse() {
                self.archive.atomic_writes = v;
            }
        }

        // Performance overrides
        if let Ok(val) = std::env::var("SCT_PERFORMANCE_PARALLELISM") {
            if let Ok(v) = val.parse() {
                self.performance.parallelism = v;
            }
        }
        if let Ok(val) = std::env::var("SCT_PERFORMANCE_CHANNEL_BUFFER") {
            if let Ok(v) = val.parse() {
                self.performance.channel_buffer = v;
            }
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.buffer_size == 0 {
            return Err(TensorError::config(
                "storage.buffer_size must be greater than 0",
            ));
        }

        if self.dataset.partition_size == 0 {
            return Err(TensorError::config(
                "dataset.partition_size must be greater than 0",
            ));
        }

        self.archive.validate()?;

        if self.performance.parallelism == 0 {
            return Err(TensorError::config(
                "performance.parallelism must be greater than 0",
            ));
        }

        if self.performance.channel_buffer == 0 {
            return Err(TensorError::config(
                "performance.channel_buffer must be greater than 0",
            ));
        }

        Ok(())
    }
}

// Held by every test that sets SCT_ variables or reads them through
// `with_env_overrides`.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
