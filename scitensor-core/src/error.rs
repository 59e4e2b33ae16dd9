// scitensor-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {

    #[error("Failed to load dataset source '{descriptor}': {message}")]
    Load {
        descriptor: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Variable '{variable}' not found in dataset source '{descriptor}'")]
    VariableNotFound {
        variable: String,
        descriptor: String,
    },

    #[error("Shape error: {message}")]
    Shape {
        message: String,
    },

    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Archive error: {message}")]
    Archive {
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Partition {index} out of range (total partitions: {total})")]
    InvalidPartition {
        index: u32,
        total: u32,
    },
}

pub type Result<T> = std::result::Result<T, TensorError>;

// Convenience constructors
impl TensorError {

    pub fn load(descriptor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            descriptor: descriptor.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn load_with_source(
        descriptor: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Load {
            descriptor: descriptor.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn variable_not_found(variable: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self::VariableNotFound {
            variable: variable.into(),
            descriptor: descriptor.into(),
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_partition(index: u32, total: u32) -> Self {
        Self::InvalidPartition { index, total }
    }
}
