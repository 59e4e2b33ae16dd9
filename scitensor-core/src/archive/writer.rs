// scitensor-core/src/archive/writer.rs

//! Archive writer implementation.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use twox_hash::XxHash64;

use crate::config::ArchiveConfig;
use crate::error::{Result, TensorError};
use crate::storage::StorageBackend;

use super::format::{Archive, ArchiveHeader};

/// Writes record archives through a storage backend.
///
/// Values are always stored as 32-bit floats. Writes go through a
/// temporary file and a rename when `atomic_writes` is enabled.
pub struct ArchiveWriter {
    storage: Arc<dyn StorageBackend>,
    config: ArchiveConfig,
}

impl ArchiveWriter {
    pub fn new(storage: Arc<dyn StorageBackend>, config: ArchiveConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Writes `archive` to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if a field's value count doesn't match its shape,
    /// compression fails, or the storage backend cannot write the file.
    pub fn write(&self, path: &Path, archive: &Archive) -> Result<()> {
        let payload = encode_payload(archive)?;
        let checksum = calculate_checksum(&payload);
        let compressed = self.compress(&payload)?;

        let header = ArchiveHeader::new(
            self.config.compression.clone(),
            archive.fields.iter().map(|f| f.spec()).collect(),
            archive.attributes.clone(),
            payload.len() as u64,
            checksum,
        );
        let header_bytes = bincode::serialize(&header)
            .map_err(|e| TensorError::archive(format!("failed to serialize header: {e}")))?;

        let mut bytes = Vec::with_capacity(4 + header_bytes.len() + compressed.len());
        bytes.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&header_bytes);
        bytes.extend_from_slice(&compressed);

        if self.config.atomic_writes {
            let temp_path = temp_path_for(path)?;
            if let Err(e) = self.write_to_path(&temp_path, &bytes) {
                let _ = self.storage.delete(&temp_path);
                return Err(e);
            }
            self.storage.rename(&temp_path, path)?;
        } else {
            self.write_to_path(path, &bytes)?;
        }

        tracing::info!(
            path = %path.display(),
            fields = archive.fields.len(),
            bytes = bytes.len(),
            compression = %self.config.compression,
            "wrote record archive"
        );

        Ok(())
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self.config.compression.as_str() {
            "none" => Ok(data.to_vec()),
            "lz4" => Ok(lz4_flex::compress_prepend_size(data)),
            "zstd" => zstd::encode_all(data, self.config.compression_level)
                .map_err(|e| TensorError::archive(format!("zstd compression failed: {e}"))),
            other => Err(TensorError::archive(format!(
                "unknown compression algorithm: {other}"
            ))),
        }
    }

    fn write_to_path(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut writer = self.storage.open_write(path)?;
        writer
            .write_all(data)
            .map_err(|e| TensorError::storage_with_source(path, "failed to write archive", e))?;
        writer.finish()
    }
}

fn encode_payload(archive: &Archive) -> Result<Vec<u8>> {
    let total: usize = archive.fields.iter().map(|f| f.values.len()).sum();
    let mut payload = Vec::with_capacity(total * std::mem::size_of::<f32>());

    for field in &archive.fields {
        let expected = field.spec().numel();
        if expected != Some(field.values.len()) {
            return Err(TensorError::archive(format!(
                "field '{}' has {} values but shape {:?} does not match",
                field.name,
                field.values.len(),
                field.shape
            )));
        }
        for value in &field.values {
            payload.extend_from_slice(&value.to_le_bytes());
        }
    }

    Ok(payload)
}

pub(super) fn calculate_checksum(data: &[u8]) -> u64 {
    use std::hash::Hasher;
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

// `.<name>.tmp` next to the final path.
fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TensorError::archive(format!("invalid archive path: {}", path.display())))?;
    Ok(path.with_file_name(format!(".{file_name}.tmp")))
}
