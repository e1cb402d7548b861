//! Error types for Sthiti

use thiserror::Error;

/// Map message rejected by the grid processor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("map is not square: {width}x{height}")]
    NonSquare { width: usize, height: usize },

    #[error("malformed map: {0}")]
    Malformed(String),
}

/// Frame-transform lookup failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("no transform path from '{source_frame}' to '{target}'")]
    UnknownFrame { target: String, source_frame: String },

    #[error("transform '{child}' -> '{parent}' not available at {stamp_us}us (history {oldest_us}..={newest_us}us)")]
    Extrapolation {
        parent: String,
        child: String,
        stamp_us: u64,
        oldest_us: u64,
        newest_us: u64,
    },
}

/// Per-update localization failure.
///
/// Every variant leaves the fusion state untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocalizeError {
    #[error("no map received yet")]
    NoMap,

    #[error("lookup {target} <- {source_frame} failed: {cause}")]
    Lookup {
        target: String,
        source_frame: String,
        #[source]
        cause: LookupError,
    },

    #[error("too few scan points: {count} < {min}")]
    TooFewPoints { count: usize, min: usize },

    #[error("pose estimate in frame '{got}', expected '{expected}'")]
    InvalidFrame { expected: String, got: String },

    #[error(transparent)]
    Map(#[from] MapError),
}

/// Configuration loading error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, LocalizeError>;
