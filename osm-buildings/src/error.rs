use thiserror::Error;

/// Errors raised by the extraction pipeline
///
/// Per-building problems (an odd `height` tag, a broken footprint) are logged
/// and skipped by the builder; only setup and I/O failures surface here.
#[derive(Debug, Error)]
pub enum BuildingsError {
    /// Missing input path, too many positional arguments, ...
    #[error("invalid arguments: {0}")]
    InputArgument(String),

    /// Region not present in the EUI table
    #[error("unknown region '{region}' (known regions: {known})")]
    UnknownRegion { region: String, known: String },

    /// WKB could not be turned into a polygon or multipolygon
    #[error("failed to decode building geometry: {0}")]
    GeometryDecode(String),

    /// Equal-area projection could not be built or applied
    #[error("projection failed: {0}")]
    Projection(String),

    /// Map-data decoder failure
    #[error("failed to decode map data: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type BuildingsResult<T> = std::result::Result<T, BuildingsError>;
