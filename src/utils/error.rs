//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//! The aggregation core itself has no error surface.

use thiserror::Error;

/// Errors that can occur while reading a sample stream
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid sample line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },

    #[error("Invalid process id: {0}")]
    InvalidProcessId(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors that can occur while loading symbols
#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Failed to read symbol map: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid address in symbol map: {0}")]
    InvalidAddress(String),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Flame graph generation failed: {0}")]
    GenerationFailed(String),

    #[error("Empty stack data")]
    EmptyStacks,
}
