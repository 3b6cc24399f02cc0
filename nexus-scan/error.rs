//! Error types for extraction, scoring, configuration and scans.

use std::path::PathBuf;

use nexus_fast::FastError;
use thiserror::Error;

/// Feature extraction failures
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Image has zero width or height
    #[error("image has no pixels")]
    EmptyImage,

    /// Detector rejected its configuration or the pixel buffer
    #[error("detector error: {0}")]
    Detector(#[from] FastError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    /// Source image produced no keypoints, so no percentage is defined
    #[error("source has no keypoints")]
    DegenerateInput,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid toml: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("cannot encode toml: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("unsupported config format: {0} (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("detector settings: {0}")]
    Detector(#[from] FastError),
}

/// Failures that stop a scan before any event is emitted
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot read candidate directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("feature extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// Source yields zero keypoints; the scan declines to start
    #[error("image {0} has no detectable features")]
    DegenerateSource(PathBuf),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ScanResult<T> = Result<T, ScanError>;
