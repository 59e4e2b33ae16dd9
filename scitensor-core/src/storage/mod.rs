// scitensor-core/src/storage/mod.rs

//! Storage abstraction used by source loaders and the archive writer.
//!
//! # Example
//!
//! ```no_run
//! use scitensor_core::config::StorageConfig;
//! use scitensor_core::storage::{LocalStorage, StorageBackend};
//! use std::io::Write;
//! use std::path::Path;
//!
//! let storage = LocalStorage::new(&StorageConfig::default()).unwrap();
//!
//! let mut writer = storage.open_write(Path::new("example.bin")).unwrap();
//! writer.write_all(b"payload").unwrap();
//! writer.finish().unwrap();
//!
//! let mut reader = storage.open_read(Path::new("example.bin")).unwrap();
//! let bytes = reader.read_all().unwrap();
//! ```

mod local;
mod traits;

pub use local::LocalStorage;
pub use traits::{StorageBackend, StorageReader, StorageWriter};
