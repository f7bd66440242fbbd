use std::path::PathBuf;

use thiserror::Error;

/// Failures while acquiring a still image. The pipeline state is left as it
/// was before the failing call.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no active camera stream")]
    CameraUnavailable,

    #[error("camera frame could not be read: {0}")]
    Frame(String),

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a supported image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("image has no pixels")]
    EmptyImage,

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

/// Failures while committing a crop. Crop mode stays active so the user can
/// adjust the region and retry.
#[derive(Error, Debug)]
pub enum CropError {
    #[error("crop region is degenerate ({width}x{height})")]
    Degenerate { width: f64, height: f64 },

    #[error("source image is not loaded: {0}")]
    SourceNotLoaded(#[source] image::ImageError),

    #[error("failed to encode cropped image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("displayed size must be positive, got {width}x{height}")]
    InvalidDisplay { width: f64, height: f64 },

    #[error("no crop in progress")]
    NotCropping,
}

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;
pub type CropResult<T> = std::result::Result<T, CropError>;
