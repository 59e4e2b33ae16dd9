// scitensor-core/src/storage/traits.rs

//! Storage abstraction traits.
//!
//! Dataset sources and record archives are read and written through these
//! traits so loaders never touch the filesystem directly.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::Result;

/// A handle for reading a stored object.
pub trait StorageReader: Read + Send {
    /// Returns the total size of the object in bytes.
    fn size(&self) -> u64;

    /// Reads the remainder of the object into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn read_all(&mut self) -> Result<Vec<u8>>;
}

/// A handle for writing to storage.
pub trait StorageWriter: Write + Send {
    /// Finishes the write operation, ensuring all data is persisted.
    ///
    /// After calling `finish`, the writer must not be used again.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or syncing fails.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// The core storage backend trait.
///
/// This trait is object-safe and is shared as `Arc<dyn StorageBackend>`
/// between loaders, archive readers and archive writers.
pub trait StorageBackend: Send + Sync {
    /// Checks if an object exists at the given path.
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Opens an object for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist or cannot be opened.
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>>;

    /// Opens an object for writing, truncating any existing object.
    ///
    /// Parent directories are created if they don't exist.
    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>>;

    /// Deletes an object.
    fn delete(&self, path: &Path) -> Result<()>;

    /// Renames an object from one path to another.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}
