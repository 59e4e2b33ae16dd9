// scitensor-core/src/archive/reader.rs

//! Archive reader implementation.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, TensorError};
use crate::storage::StorageBackend;

use super::format::{Archive, ArchiveField, ArchiveHeader};
use super::writer::calculate_checksum;

/// Reads and verifies record archives.
pub struct ArchiveReader {
    storage: Arc<dyn StorageBackend>,
}

impl ArchiveReader {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Reads, decompresses and verifies the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The magic bytes or version are invalid
    /// - The checksum or payload size doesn't match the header
    /// - Decompression fails
    pub fn read(&self, path: &Path) -> Result<Archive> {
        let bytes = self.storage.open_read(path)?.read_all()?;
        decode(&bytes)
    }

    /// Reads only the header, leaving the payload untouched.
    pub fn read_header(&self, path: &Path) -> Result<ArchiveHeader> {
        let mut reader = self.storage.open_read(path)?;

        let mut len_bytes = [0u8; 4];
        reader
            .read_exact(&mut len_bytes)
            .map_err(|e| TensorError::archive(format!("failed to read header length: {e}")))?;
        let header_len = u32::from_le_bytes(len_bytes) as usize;

        if 4 + header_len as u64 > reader.size() {
            return Err(TensorError::archive("archive truncated: header incomplete"));
        }

        let mut header_bytes = vec![0u8; header_len];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| TensorError::archive(format!("failed to read header: {e}")))?;

        parse_header(&header_bytes)
    }
}

/// Decodes a complete archive image.
pub fn decode(bytes: &[u8]) -> Result<Archive> {
    if bytes.len() < 4 {
        return Err(TensorError::archive("archive file too small"));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[..4]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    if bytes.len() < 4 + header_len {
        return Err(TensorError::archive("archive truncated: header incomplete"));
    }

    let header = parse_header(&bytes[4..4 + header_len])?;
    let payload = decompress(&bytes[4 + header_len..], &header.compression)?;

    let computed = calculate_checksum(&payload);
    if computed != header.checksum {
        return Err(TensorError::archive(format!(
            "checksum mismatch: expected {}, got {computed}",
            header.checksum
        )));
    }

    let expected = header
        .expected_payload_size()
        .ok_or_else(|| TensorError::archive("field shape overflows"))?;

    if payload.len() as u64 != header.uncompressed_size || header.uncompressed_size != expected {
        return Err(TensorError::archive(format!(
            "size mismatch: header declares {} bytes, fields need {expected}, payload has {}",
            header.uncompressed_size,
            payload.len()
        )));
    }

    let mut values = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]));

    let fields = header
        .fields
        .into_iter()
        .map(|spec| {
            let field_values: Vec<f32> = values.by_ref().take(spec.numel().unwrap_or(0)).collect();
            ArchiveField {
                name: spec.name,
                shape: spec.shape,
                values: field_values,
            }
        })
        .collect();

    Ok(Archive {
        fields,
        attributes: header.attributes,
    })
}

fn parse_header(bytes: &[u8]) -> Result<ArchiveHeader> {
    let header: ArchiveHeader = bincode::deserialize(bytes)
        .map_err(|e| TensorError::archive(format!("failed to deserialize header: {e}")))?;

    if !header.validate_magic() {
        return Err(TensorError::archive(format!(
            "invalid magic bytes: expected {:?}, got {:?}",
            ArchiveHeader::MAGIC,
            header.magic
        )));
    }

    if !header.validate_version() {
        return Err(TensorError::archive(format!(
            "unsupported version: expected {}, got {}",
            ArchiveHeader::VERSION,
            header.version
        )));
    }

    Ok(header)
}

fn decompress(data: &[u8], algorithm: &str) -> Result<Vec<u8>> {
    match algorithm {
        "none" => Ok(data.to_vec()),
        "lz4" => lz4_flex::decompress_size_prepended(data)
            .map_err(|e| TensorError::archive(format!("lz4 decompression failed: {e}"))),
        "zstd" => zstd::decode_all(data)
            .map_err(|e| TensorError::archive(format!("zstd decompression failed: {e}"))),
        other => Err(TensorError::archive(format!(
            "unknown compression algorithm: {other}"
        ))),
    }
}
