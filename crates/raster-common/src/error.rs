//! Error types for rasterdb operations.

use thiserror::Error;

/// Result type alias for rasterdb operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Errors that can occur while resolving, reading, or writing coverages.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The connection identifier does not follow the expected grammar.
    #[error("invalid connection identifier: {0}")]
    InvalidConnectionId(String),

    /// The named coverage does not exist or could not be loaded.
    #[error("invalid coverage: {0}")]
    CoverageNotFound(String),

    /// The requested section does not exist within the coverage.
    #[error("invalid section {section} of coverage {coverage}")]
    SectionNotFound { coverage: String, section: i64 },

    /// Resolved raster geometry is unusable (zero, negative, or oversized).
    #[error("invalid dimensions: {0}")]
    InvalidGeometry(String),

    /// A geotransform with rotation or shearing terms was supplied.
    #[error("rasters with rotation/shearing geotransform terms are not supported")]
    RotatedGeoTransform,

    /// Sample or data type outside the supported set.
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Band count outside the supported range.
    #[error("unsupported band count: {0}")]
    UnsupportedBandCount(usize),

    /// A creation option is missing another option it depends on.
    #[error("{option} must be specified with {required_with}")]
    MissingOption {
        option: &'static str,
        required_with: &'static str,
    },

    /// A fetched tile buffer did not have the expected size.
    #[error("got {actual} bytes instead of {expected}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    /// Failure reported by the storage registry.
    #[error("storage error: {0}")]
    Storage(String),

    /// Failure reported by the tile engine.
    #[error("tile engine error: {0}")]
    Engine(String),

    /// Failed to open a dataset.
    #[error("failed to open dataset: {0}")]
    OpenFailed(String),

    /// Failed to read raster data.
    #[error("failed to read raster data: {0}")]
    ReadFailed(String),

    /// Failed to create or populate a coverage.
    #[error("failed to create coverage: {0}")]
    CreateFailed(String),

    /// The progress callback requested cancellation.
    #[error("operation cancelled")]
    Cancelled,
}

impl RasterError {
    /// Create a Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an Engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create a CreateFailed error.
    pub fn create_failed(msg: impl Into<String>) -> Self {
        Self::CreateFailed(msg.into())
    }

    /// Create an InvalidGeometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }
}
