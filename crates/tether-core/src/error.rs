//! Structured error types for the tether crates.

use thiserror::Error;

/// Unified error type for all tether-core operations.
#[derive(Debug, Error)]
pub enum TetherError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Coordinate file could not be parsed into an ensemble
    #[error("coordinate parse error: {0}")]
    CoordinateParse(String),

    /// Restraint document could not be deserialized
    #[error("restraint parse error: {0}")]
    RestraintParse(#[from] serde_json::Error),

    /// A required input was missing or empty
    #[error("input unavailable: {0}")]
    InputUnavailable(String),

    /// Report cache entry could not be read or written
    #[error("cache error: {0}")]
    Cache(String),
}

/// Convenience alias used throughout the tether crates.
pub type Result<T> = std::result::Result<T, TetherError>;
