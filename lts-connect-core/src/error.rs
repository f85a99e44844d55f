use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Geometry must be a LineString or MultiLineString, got {0}")]
    InvalidGeometryKind(String),
    #[error("Segment name '{name}' was already used by {owner}. Try another name or overwrite")]
    NameConflict { owner: String, name: String },
    #[error("Network type '{0}' is not supported, expected lts or sidewalk")]
    NetworkTypeUnsupported(String),
    #[error("Isochrone computation failed: {0}")]
    IsochroneComputationFailed(String),
    #[error("External service error: {0}")]
    ExternalService(String),
    #[error("Persistence error ({context}): {message}")]
    Persistence { context: String, message: String },
    #[error("Unknown data layer: {0}")]
    UnknownLayer(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
    #[error("CSV error: {0}")]
    CsvError(String),
}

impl Error {
    pub(crate) fn persistence(context: impl Into<String>, message: impl ToString) -> Self {
        Error::Persistence {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
