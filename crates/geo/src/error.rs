//! Error types for the geo crate.

use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur during geo operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The batch is not a well-formed collection of elements
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Invalid coordinate values
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// A GeoJSON document has the wrong shape
    #[error("Unexpected geometry: expected {expected}, found {found}")]
    UnexpectedGeometry {
        expected: &'static str,
        found: String,
    },

    /// Region code that is not `JP-NN`
    #[error("Invalid region code: {0}")]
    InvalidRegionCode(String),
}

/// Error code for integration with coastwalk-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Malformed element batch
    MalformedInput = 10001,
    /// Invalid coordinate values
    InvalidCoordinate = 10002,
    /// GeoJSON geometry of the wrong type
    UnexpectedGeometry = 10003,
    /// Region code that does not parse
    InvalidRegionCode = 10004,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::MalformedInput(_) => GeoErrorCode::MalformedInput,
            GeoError::InvalidCoordinate(_) => GeoErrorCode::InvalidCoordinate,
            GeoError::UnexpectedGeometry { .. } => GeoErrorCode::UnexpectedGeometry,
            GeoError::InvalidRegionCode(_) => GeoErrorCode::InvalidRegionCode,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        GeoError::MalformedInput(message.into())
    }
}
