use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The crate's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    MissingForward {
        what: &'static str,
    },
    TargetOutOfRange {
        row: usize,
        target: usize,
        classes: usize,
    },
    InvalidParamHandle {
        handle: usize,
        len: usize,
    },
    InvalidLayer(&'static str),
    EmptyBatch,
    EmptySource,
    Shape(ShapeError),
    Init(String),
    Config(serde_json::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MlErr::SizeMismatch {
                a,
                b,
                got,
                expected,
            } => {
                format!(
                    "There's a size mismatch between {a} and {b}, got {got} and expected {expected}"
                )
            }
            MlErr::MissingForward { what } => {
                format!("Called backward on {what} without a matching forward pass")
            }
            MlErr::TargetOutOfRange {
                row,
                target,
                classes,
            } => format!(
                "The target {target} of row {row} is out of range, there are {classes} classes"
            ),
            MlErr::InvalidParamHandle { handle, len } => format!(
                "The parameter handle {handle} is invalid, the layer has {len} parameters"
            ),
            MlErr::InvalidLayer(msg) => format!("Invalid layer: {msg}"),
            MlErr::EmptyBatch => "Got an empty batch".to_string(),
            MlErr::EmptySource => "The batch source yielded no batches".to_string(),
            MlErr::Shape(e) => format!("Parameter has an unexpected shape: {e}"),
            MlErr::Init(msg) => format!("Invalid initialization: {msg}"),
            MlErr::Config(e) => format!("Invalid configuration: {e}"),
        };

        write!(f, "{s}")
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            MlErr::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}
