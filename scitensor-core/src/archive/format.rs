// scitensor-core/src/archive/format.rs

//! Record archive file format.
//!
//! ```text
//! +-------------------------+
//! | Header Length (4 bytes) |  <- u32 little-endian
//! +-------------------------+
//! | Header (bincode)        |  <- ArchiveHeader
//! +-------------------------+
//! | Payload                 |  <- f32 LE values of every field, in field
//! |                         |     order, compressed per header
//! +-------------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name and shape of one array stored in an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl FieldSpec {
    /// Number of values the field occupies in the payload, or `None` if
    /// the shape overflows `usize`.
    pub fn numel(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }
}

/// Header for an archive file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveHeader {
    /// Magic bytes identifying this as a record archive ("SCTA")
    pub magic: [u8; 4],
    /// Format version number
    pub version: u32,
    /// Compression algorithm used ("none", "lz4", or "zstd")
    pub compression: String,
    /// Field layout, in payload order
    pub fields: Vec<FieldSpec>,
    /// Record-level attributes
    pub attributes: HashMap<String, String>,
    /// Size of the payload before compression
    pub uncompressed_size: u64,
    /// XXHash64 checksum of the uncompressed payload
    pub checksum: u64,
}

impl ArchiveHeader {
    pub const MAGIC: [u8; 4] = *b"SCTA";

    pub const VERSION: u32 = 1;

    pub fn new(
        compression: String,
        fields: Vec<FieldSpec>,
        attributes: HashMap<String, String>,
        uncompressed_size: u64,
        checksum: u64,
    ) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            compression,
            fields,
            attributes,
            uncompressed_size,
            checksum,
        }
    }

    pub fn validate_magic(&self) -> bool {
        self.magic == Self::MAGIC
    }

    pub fn validate_version(&self) -> bool {
        self.version == Self::VERSION
    }

    /// Payload size implied by the field shapes, or `None` if it overflows.
    pub fn expected_payload_size(&self) -> Option<u64> {
        self.fields.iter().try_fold(0u64, |total, f| {
            let bytes = u64::try_from(f.numel()?)
                .ok()?
                .checked_mul(std::mem::size_of::<f32>() as u64)?;
            total.checked_add(bytes)
        })
    }
}

/// One named array held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveField {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl ArchiveField {
    pub fn spec(&self) -> FieldSpec {
        FieldSpec {
            name: self.name.clone(),
            shape: self.shape.clone(),
        }
    }
}

/// Decoded contents of an archive file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Archive {
    pub fields: Vec<ArchiveField>,
    pub attributes: HashMap<String, String>,
}

impl Archive {
    pub fn field(&self, name: &str) -> Option<&ArchiveField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}
