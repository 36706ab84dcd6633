//! Error types for scull
//!
//! Provides a unified error type for all operations.

use std::io;

use thiserror::Error;

use crate::device::AccessMode;

/// Result type alias using ScullError
pub type Result<T> = std::result::Result<T, ScullError>;

/// Unified error type for scull operations
#[derive(Debug, Error)]
pub enum ScullError {
    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Geometry cannot change while the device holds data")]
    GeometryInUse,

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Out of memory allocating {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Buffer fault: {0}")]
    BufferFault(#[source] io::Error),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Interrupted while waiting for the device lock")]
    Interrupted,

    // -------------------------------------------------------------------------
    // Registry / Handle Errors
    // -------------------------------------------------------------------------
    #[error("No such device: minor {0}")]
    NoSuchDevice(u32),

    #[error("File opened {mode} does not permit {operation}")]
    WrongAccessMode {
        mode: AccessMode,
        operation: &'static str,
    },

    // -------------------------------------------------------------------------
    // Shell Errors
    // -------------------------------------------------------------------------
    #[error("Command error: {0}")]
    Command(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<ScullError> for io::Error {
    fn from(err: ScullError) -> Self {
        if let ScullError::Io(e) = err {
            return e;
        }
        let kind = match &err {
            ScullError::InvalidConfiguration(_)
            | ScullError::InvalidOffset(_)
            | ScullError::Command(_) => io::ErrorKind::InvalidInput,
            ScullError::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
            ScullError::NoSuchDevice(_) => io::ErrorKind::NotFound,
            ScullError::WrongAccessMode { .. } => io::ErrorKind::PermissionDenied,
            // Not ErrorKind::Interrupted: std's write_all/read_exact retry those.
            ScullError::Interrupted
            | ScullError::BufferFault(_)
            | ScullError::GeometryInUse
            | ScullError::Io(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
