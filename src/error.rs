use std::path::PathBuf;

use thiserror::Error;

use crate::{
    adapters::AdapterError,
    dynetml::{ConfigError, FormatError, SerializationError, XmlError},
    model::{ModelError, SliceError},
};

/// Crate-level error. Each stage has its own error type; they all convert into this one.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Time slice error: {0}")]
    Slice(#[from] SliceError),
}

impl From<XmlError> for Error {
    fn from(e: XmlError) -> Self {
        Error::Format(FormatError::Xml(e))
    }
}

impl Error {
    /// Whether the failure came from an edge pointing at an undeclared node.
    pub fn is_dangling_reference(&self) -> bool {
        match self {
            Error::Format(e) => e.is_dangling_reference(),
            Error::Model(e) | Error::Adapter(AdapterError::Model(e)) => {
                matches!(e, ModelError::DanglingReference { .. })
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
