//! Camera access.
//!
//! The pipeline never talks to a device directly. It holds a
//! [`CameraSession`], which owns one [`FrameSource`] and stops it when the
//! session is dropped, so leaving camera mode for any reason releases the
//! device.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::image::RawImage;
use crate::error::{CaptureError, CaptureResult};

/// A live camera stream that can hand out still frames.
pub trait FrameSource: Send {
    /// Human readable label used in logs.
    fn label(&self) -> &str {
        "camera"
    }

    /// Grab the current frame as an encoded still.
    ///
    /// May block on device or file I/O; async callers go through
    /// `CapturePipeline::capture_from_camera_async`.
    fn grab_frame(&mut self) -> CaptureResult<RawImage>;

    /// Release the underlying device. Must be idempotent.
    fn stop(&mut self);
}

/// Exclusive owner of an active camera stream.
pub struct CameraSession {
    source: Box<dyn FrameSource>,
}

impl fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraSession")
            .field("source", &self.source.label())
            .finish()
    }
}

impl CameraSession {
    pub fn start(source: Box<dyn FrameSource>) -> Self {
        debug!(source = source.label(), "camera session started");
        Self { source }
    }

    pub fn grab_frame(&mut self) -> CaptureResult<RawImage> {
        self.source.grab_frame()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.source.stop();
        debug!(source = self.source.label(), "camera session released");
    }
}

/// Reads frames from a still file that an external capture daemon keeps
/// overwriting (e.g. `fswebcam --loop` or a v4l2 snapshot service).
#[derive(Debug)]
pub struct SnapshotFrameSource {
    path: PathBuf,
    label: String,
    active: bool,
}

impl SnapshotFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("snapshot:{}", path.display());
        Self {
            path,
            label,
            active: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl FrameSource for SnapshotFrameSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn grab_frame(&mut self) -> CaptureResult<RawImage> {
        if !self.active {
            return Err(CaptureError::CameraUnavailable);
        }
        let bytes = std::fs::read(&self.path).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "snapshot frame unreadable");
            CaptureError::Frame(format!("{}: {source}", self.path.display()))
        })?;
        RawImage::from_bytes(bytes)
    }

    fn stop(&mut self) {
        self.active = false;
    }
}
