//! Capture/crop pipeline: acquire one still, optionally crop it, hand the
//! result to submission.

pub mod camera;
pub mod crop;
pub mod image;
pub mod pipeline;

pub use self::camera::{CameraSession, FrameSource, SnapshotFrameSource};
pub use self::crop::{
    AspectRatio, CropRegion, DisplayMapping, DisplayRect, PixelRect, render_crop,
};
pub use self::image::{FinalImage, RawImage};
pub use self::pipeline::{CaptureMode, CapturePipeline, CaptureState, CropSettings};
