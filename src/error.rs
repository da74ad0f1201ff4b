use thiserror::Error;

#[derive(Debug, Error)]
pub enum RideError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("no tracks found in GPX file")]
    NoTracks,
    #[error("no elevation data found in GPX file")]
    NoElevation,
    #[error("unknown data processor: {0}")]
    UnknownProcessor(String),
}
