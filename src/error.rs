use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the dataset cache, the loaders and the wrapper.
/// None of them are retried.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to read cached tensor {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write tensor {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cached tensor {path} is corrupt: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("Failed to encode tensor {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cached images hold {images} rows but latents hold {latents}")]
    LengthMismatch { images: usize, latents: usize },
    #[error("Sample {index} has {what} shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("Generator returned {found} samples, {expected} were requested")]
    SampleCount { expected: usize, found: usize },
    #[error("Latent vectors have {found} dims but the normalization expects {expected}")]
    LatentDims { expected: usize, found: usize },
    #[error("Identifiability path already set.")]
    IdentifiabilityPathAlreadySet,
    #[error("Identifiability path not set.")]
    IdentifiabilityPathNotSet,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Sample generator failed: {0:#}")]
    Generator(anyhow::Error),
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;
