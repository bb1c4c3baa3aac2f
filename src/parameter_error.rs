//! Error handling for arm configuration

use std::io;

use crate::kinematic_traits::JOINT_COUNT;

/// Unified error to report invalid arm configuration, both when constructed in code and
/// when read from the YAML file.
#[derive(Debug)]
pub enum ParameterError {
    IoError(io::Error),
    ParseError(String),
    MissingField(String),
    WrongAngle(String),
    InvalidLength { expected: usize, found: usize },
    InvalidConfiguration(String),
}

impl std::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ParameterError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            ParameterError::ParseError(ref msg) =>
                write!(f, "Parse Error: {}", msg),
            ParameterError::WrongAngle(ref msg) =>
                write!(f, "Wrong angle representation: {}", msg),
            ParameterError::MissingField(ref field) =>
                write!(f, "Missing Field: {}", field),
            ParameterError::InvalidLength { expected, found } =>
                write!(f, "Invalid Length: expected {}, found {}", expected, found),
            ParameterError::InvalidConfiguration(ref msg) =>
                write!(f, "Invalid Configuration: {}", msg),
        }
    }
}

impl std::error::Error for ParameterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParameterError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ParameterError {
    fn from(err: io::Error) -> Self {
        ParameterError::IoError(err)
    }
}

/// Convert a slice into the fixed array of four values, one per joint or segment.
pub(crate) fn four_of<T: Copy>(values: &[T]) -> Result<[T; 4], ParameterError> {
    <[T; 4]>::try_from(values).map_err(|_| ParameterError::InvalidLength {
        expected: JOINT_COUNT,
        found: values.len(),
    })
}
