use thiserror::Error;

use crate::events::EventKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("polygon {id} needs at least 3 vertices, got {got}")]
    InvalidPolygon { id: i64, got: usize },

    #[error("line {id} has zero length")]
    DegenerateLine { id: i64 },

    #[error("calibration mapper needs exactly 4 point pairs, got {0}")]
    InvalidCalibration(usize),

    #[error("perspective transform could not be solved for the given points")]
    SingularTransform,

    #[error("event '{0}' requires a previous event")]
    MissingPreviousEvent(EventKind),

    #[error("detector error: {0}")]
    Detector(String),

    #[error("frame source error: {0}")]
    Source(String),

    #[error("frame encoding error: {0}")]
    Encode(String),

    #[error("forwarding error: {0}")]
    Forward(String),

    #[error("forwarding timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
