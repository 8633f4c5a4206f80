//! Error handling for the configuration readers

use std::io;
use thiserror::Error;

/// Unified error to report failures while reading or validating the controller configuration.
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("IO Error: {0}")]
    IoError(#[from] io::Error),

    #[error("Parse Error: {0}")]
    ParseError(String),

    #[error("Wrong angle representation: {0}")]
    WrongAngle(String),

    #[error("Invalid value of '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ParameterError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ParameterError::InvalidValue { field, reason: reason.into() }
    }
}
