use std::path::PathBuf;

use thiserror::Error;

use crate::frame::FrameKind;

/// Metadata field checked when validating a combine group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HomogeneityField {
    Role,
    Exposure,
    Filter,
}

impl std::fmt::Display for HomogeneityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Role => write!(f, "frame role"),
            Self::Exposure => write!(f, "exposure time"),
            Self::Filter => write!(f, "filter"),
        }
    }
}

#[derive(Error, Debug)]
pub enum FinestresError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load '{path}': {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("FITS error: {0}")]
    Fits(#[from] fitsio::errors::Error),

    #[error("Invalid FITS data: {0}")]
    InvalidFits(String),

    #[error("Frame '{title}' does not contain any pixel data")]
    MissingData { title: String },

    #[error("Frame '{title}' has shape {found:?}, expected {expected}")]
    ShapeMismatch {
        title: String,
        expected: String,
        found: Vec<usize>,
    },

    #[error("Frame '{title}' is of kind {kind}, expected an image")]
    Kind { title: String, kind: FrameKind },

    #[error("All exposures must share the same {field}: '{title}' has {found}, expected {expected}")]
    Homogeneity {
        field: HomogeneityField,
        title: String,
        expected: String,
        found: String,
    },

    #[error("Operation only applies to {expected} frames, not {found}")]
    Role { expected: String, found: String },

    #[error("Cannot normalize '{title}': maximum pixel value is {max}")]
    Normalization { title: String, max: f64 },

    #[error("More than one master {kind} for {key}")]
    DuplicateMaster { kind: String, key: String },

    #[error("Invalid weight matrix: {0}")]
    InvalidWeights(String),

    #[error("No individual exposures provided")]
    EmptyInput,

    #[error("Calibration builder is {found}, expected {expected}")]
    InvalidState { expected: String, found: String },
}

pub type Result<T> = std::result::Result<T, FinestresError>;
