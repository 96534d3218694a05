// src/error.rs
use thiserror::Error;

/// Errors raised outside the per-frame core: configuration, photo decoding
/// and landmark sources. The classifier, mode machine and animation driver
/// never fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Landmark source failed to start: {0}")]
    SourceInit(String),

    #[error("Landmark inference failed: {0}")]
    Inference(String),

    #[error("No camera available")]
    NoCamera,
}

pub type Result<T> = std::result::Result<T, Error>;
