//! Error type shared by every stage of mock ingestion and template assignment

use std::path::PathBuf;

use mock_math::{KdTreeError, MixtureError};
use thiserror::Error;

use crate::sky::SkyBounds;

/// Errors that can occur while reading mocks or assigning templates
#[derive(Error, Debug)]
pub enum MockError {
    #[error("Mock file {0} not found")]
    MissingSource(PathBuf),
    #[error("No objects in range {0}")]
    EmptyRegion(SkyBounds),
    #[error("No objects with mag < {0}")]
    EmptyMagnitudeCut(f64),
    #[error("Unable to find files matching {0}")]
    NoFilesFound(String),
    #[error("Unrecognized {kind} {name}")]
    Unrecognized { kind: &'static str, name: String },
    #[error("Cannot encode row {row} of file {file}: value out of range")]
    EncodeOutOfRange { row: i64, file: i64 },
    #[error("Cannot decode mock id {0}: value out of range")]
    DecodeOutOfRange(i64),
    #[error("Length mismatch in {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Column {column} not found in {table}")]
    MissingColumn { column: String, table: String },
    #[error("Column {column} has type {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Header keyword {key} missing from HDU {hdu} of {path}")]
    MissingHeader {
        key: String,
        hdu: usize,
        path: PathBuf,
    },
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("No mixture model available for {0}")]
    MissingMixtureModel(String),
    #[error("Template library {0} is empty")]
    EmptyLibrary(String),
    #[error("Object {row} has a non-finite feature vector")]
    NonFiniteFeature { row: usize },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),
    #[error("Mixture model error: {0}")]
    Mixture(#[from] MixtureError),
    #[error("Template index error: {0}")]
    KdTree(#[from] KdTreeError),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[cfg(feature = "fits")]
    #[error("FITS I/O error: {0}")]
    Fits(#[from] fitsio::errors::Error),
}

pub type Result<T> = std::result::Result<T, MockError>;
