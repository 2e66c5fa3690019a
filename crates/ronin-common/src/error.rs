//! Error types for Project Ronin.

use thiserror::Error;

/// Top-level error type for Ronin data handling.
///
/// The simulation itself never fails once constructed; these errors come
/// from building it out of external data.
#[derive(Debug, Error)]
pub enum RoninError {
    /// Game data failed validation
    #[error("Invalid game data: {0}")]
    InvalidData(String),

    /// Game data could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Ronin operations.
pub type RoninResult<T> = Result<T, RoninError>;
