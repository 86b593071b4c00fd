use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use ndarray::ShapeError;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// The trainer's error type.
#[derive(Debug)]
pub enum TrainErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    EmptySource,
    NoForwardState,
    Shape(ShapeError),
    InvalidConfig(String),
    Distribution(String),
    Io(io::Error),
    Json(serde_json::Error),
}

impl Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "size mismatch in {what}, got {got} and expected {expected}"
            ),
            TrainErr::EmptySource => write!(f, "the batch source yielded no batches"),
            TrainErr::NoForwardState => {
                write!(f, "backward was called without a preceding forward pass")
            }
            TrainErr::Shape(e) => write!(f, "shape error: {e}"),
            TrainErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            TrainErr::Distribution(msg) => write!(f, "invalid distribution: {msg}"),
            TrainErr::Io(e) => write!(f, "io error: {e}"),
            TrainErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::Shape(e) => Some(e),
            TrainErr::Io(e) => Some(e),
            TrainErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for TrainErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<io::Error> for TrainErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for TrainErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
