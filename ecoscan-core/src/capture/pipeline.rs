use std::mem;
use std::path::Path;

use ecoscan_config::ScanConfig;
use tracing::{debug, info, warn};

use super::camera::{CameraSession, FrameSource};
use super::crop::{
    AspectRatio, CropRegion, DEFAULT_MAX_ZOOM, DisplayMapping, DisplayRect,
    clamp_zoom, render_crop,
};
use super::image::{FinalImage, RawImage};
use crate::error::{CaptureError, CaptureResult, CropError, CropResult};

/// Where the next image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    Camera,
    #[default]
    Upload,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Captured {
        raw: RawImage,
        final_image: FinalImage,
    },
    Cropping {
        raw: RawImage,
        final_image: FinalImage,
        region: CropRegion,
    },
    Ready {
        raw: RawImage,
        final_image: FinalImage,
    },
}

impl CaptureState {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Captured { .. } => "captured",
            CaptureState::Cropping { .. } => "cropping",
            CaptureState::Ready { .. } => "ready",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSettings {
    pub max_zoom: f64,
    pub jpeg_quality: u8,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            max_zoom: DEFAULT_MAX_ZOOM,
            jpeg_quality: ecoscan_config::models::DEFAULT_JPEG_QUALITY,
        }
    }
}

impl From<&ScanConfig> for CropSettings {
    fn from(config: &ScanConfig) -> Self {
        Self {
            max_zoom: f64::from(config.max_zoom),
            jpeg_quality: config.jpeg_quality,
        }
    }
}

/// Acquires one still image and optionally crops it.
///
/// Every failing operation leaves the state exactly as it was. The camera
/// session, when one exists, is dropped (and therefore stopped) on mode
/// switch, after a successful capture, on retake, and with the pipeline.
#[derive(Debug, Default)]
pub struct CapturePipeline {
    mode: CaptureMode,
    camera: Option<CameraSession>,
    state: CaptureState,
    settings: CropSettings,
}

impl CapturePipeline {
    pub fn new(settings: CropSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(CropSettings::from(config))
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn settings(&self) -> CropSettings {
        self.settings
    }

    pub fn camera_active(&self) -> bool {
        self.camera.is_some()
    }

    pub fn raw_image(&self) -> Option<&RawImage> {
        match &self.state {
            CaptureState::Idle => None,
            CaptureState::Captured { raw, .. }
            | CaptureState::Cropping { raw, .. }
            | CaptureState::Ready { raw, .. } => Some(raw),
        }
    }

    /// The image that would be submitted right now.
    pub fn final_image(&self) -> Option<&FinalImage> {
        match &self.state {
            CaptureState::Idle => None,
            CaptureState::Captured { final_image, .. }
            | CaptureState::Cropping { final_image, .. }
            | CaptureState::Ready { final_image, .. } => Some(final_image),
        }
    }

    pub fn crop_region(&self) -> Option<&CropRegion> {
        match &self.state {
            CaptureState::Cropping { region, .. } => Some(region),
            _ => None,
        }
    }

    /// Switch to camera input, taking ownership of a started stream.
    ///
    /// Any previous capture is discarded, as is any earlier camera session.
    pub fn select_camera(&mut self, source: Box<dyn FrameSource>) {
        self.reset();
        self.mode = CaptureMode::Camera;
        self.camera = Some(CameraSession::start(source));
    }

    /// Switch to file input. Releases the camera if one was running.
    pub fn select_upload(&mut self) {
        self.reset();
        self.mode = CaptureMode::Upload;
    }

    /// Grab one frame from the active camera.
    pub fn capture_from_camera(&mut self) -> CaptureResult<RawImage> {
        self.require_idle("capture from camera")?;
        let session = self
            .camera
            .as_mut()
            .ok_or(CaptureError::CameraUnavailable)?;
        let raw = session.grab_frame()?;
        // Stream is no longer needed once a still exists.
        self.camera = None;
        info!(dimensions = ?raw.dimensions(), "captured camera frame");
        Ok(self.set_captured(raw))
    }

    /// [`Self::capture_from_camera`] with the grab moved onto tokio's
    /// blocking pool, for use from async code.
    pub async fn capture_from_camera_async(&mut self) -> CaptureResult<RawImage> {
        self.require_idle("capture from camera")?;
        let mut session =
            self.camera.take().ok_or(CaptureError::CameraUnavailable)?;
        let (session, grabbed) = tokio::task::spawn_blocking(move || {
            let grabbed = session.grab_frame();
            (session, grabbed)
        })
        .await
        .map_err(|err| CaptureError::Frame(format!("frame grab task failed: {err}")))?;

        let raw = match grabbed {
            Ok(raw) => raw,
            Err(err) => {
                self.camera = Some(session);
                return Err(err);
            }
        };
        drop(session);
        info!(dimensions = ?raw.dimensions(), "captured camera frame");
        Ok(self.set_captured(raw))
    }

    /// Read and sniff an image file chosen by the user.
    pub async fn load_from_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> CaptureResult<RawImage> {
        let path = path.as_ref();
        self.require_idle("load a file")?;
        let bytes =
            tokio::fs::read(path)
                .await
                .map_err(|source| CaptureError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        let raw = RawImage::from_bytes(bytes)?;
        self.camera = None;
        info!(path = %path.display(), format = ?raw.format(), "loaded image file");
        Ok(self.set_captured(raw))
    }

    /// Accept an already encoded image, e.g. from a drag-and-drop buffer.
    pub fn accept_bytes(&mut self, bytes: Vec<u8>) -> CaptureResult<RawImage> {
        self.require_idle("accept an image")?;
        let raw = RawImage::from_bytes(bytes)?;
        self.camera = None;
        Ok(self.set_captured(raw))
    }

    /// Enter crop mode with the region covering the whole raw image.
    pub fn begin_crop(&mut self) -> CaptureResult<&CropRegion> {
        self.begin_crop_with(AspectRatio::Free)
    }

    pub fn begin_crop_with(
        &mut self,
        aspect: AspectRatio,
    ) -> CaptureResult<&CropRegion> {
        match mem::take(&mut self.state) {
            CaptureState::Captured { raw, final_image } => {
                let region = CropRegion::full(raw.dimensions())
                    .with_aspect(aspect)
                    .clamped(raw.dimensions(), self.settings.max_zoom);
                debug!(?region, "crop started");
                self.state = CaptureState::Cropping {
                    raw,
                    final_image,
                    region,
                };
            }
            other => {
                let state = other.name();
                self.state = other;
                return Err(CaptureError::InvalidState {
                    action: "begin crop",
                    state,
                });
            }
        }
        self.crop_region().ok_or(CaptureError::InvalidState {
            action: "begin crop",
            state: "idle",
        })
    }

    /// Replace the crop region; the stored value is always clamped.
    pub fn update_crop(&mut self, region: CropRegion) -> CropResult<CropRegion> {
        let max_zoom = self.settings.max_zoom;
        match &mut self.state {
            CaptureState::Cropping {
                raw,
                region: current,
                ..
            } => {
                *current = region.clamped(raw.dimensions(), max_zoom);
                Ok(*current)
            }
            _ => Err(CropError::NotCropping),
        }
    }

    /// Update the crop from a rectangle drawn on a scaled preview.
    pub fn update_crop_from_display(
        &mut self,
        rect: DisplayRect,
        displayed_width: f64,
        displayed_height: f64,
        zoom: f64,
    ) -> CropResult<CropRegion> {
        let (natural, aspect) = match &self.state {
            CaptureState::Cropping { raw, region, .. } => {
                (raw.dimensions(), region.aspect)
            }
            _ => return Err(CropError::NotCropping),
        };
        let mapping =
            DisplayMapping::new(natural, displayed_width, displayed_height)?;
        let zoom = clamp_zoom(zoom, self.settings.max_zoom);
        self.update_crop(mapping.to_source(rect, zoom, aspect))
    }

    /// Render the current region and make it the final image.
    ///
    /// On failure crop mode stays active with the region untouched.
    pub fn commit_crop(&mut self) -> CropResult<&FinalImage> {
        let rendered = match &self.state {
            CaptureState::Cropping { raw, region, .. } => {
                render_crop(raw, region, self.settings.jpeg_quality)
            }
            _ => return Err(CropError::NotCropping),
        };
        let cropped = rendered.inspect_err(|error| {
            warn!(%error, "crop commit failed");
        })?;

        if let CaptureState::Cropping { raw, .. } = mem::take(&mut self.state) {
            info!(dimensions = ?cropped.dimensions(), "crop committed");
            self.state = CaptureState::Captured {
                raw,
                final_image: cropped,
            };
        }
        self.final_image().ok_or(CropError::NotCropping)
    }

    /// Leave crop mode without changing the final image.
    pub fn cancel_crop(&mut self) -> CropResult<()> {
        match mem::take(&mut self.state) {
            CaptureState::Cropping {
                raw, final_image, ..
            } => {
                debug!("crop cancelled");
                self.state = CaptureState::Captured { raw, final_image };
                Ok(())
            }
            other => {
                self.state = other;
                Err(CropError::NotCropping)
            }
        }
    }

    /// Discard everything and return to idle. Always succeeds.
    pub fn retake(&mut self) {
        debug!(from = self.state.name(), "retake");
        self.reset();
    }

    /// Lock in the final image for submission.
    pub fn finalize(&mut self) -> CaptureResult<&FinalImage> {
        match mem::take(&mut self.state) {
            CaptureState::Captured { raw, final_image }
            | CaptureState::Ready { raw, final_image } => {
                self.state = CaptureState::Ready { raw, final_image };
            }
            other => {
                let state = other.name();
                self.state = other;
                return Err(CaptureError::InvalidState {
                    action: "finalize",
                    state,
                });
            }
        }
        self.final_image().ok_or(CaptureError::InvalidState {
            action: "finalize",
            state: "idle",
        })
    }

    fn reset(&mut self) {
        self.camera = None;
        self.state = CaptureState::Idle;
    }

    fn require_idle(&self, action: &'static str) -> CaptureResult<()> {
        match self.state {
            CaptureState::Idle => Ok(()),
            ref other => Err(CaptureError::InvalidState {
                action,
                state: other.name(),
            }),
        }
    }

    fn set_captured(&mut self, raw: RawImage) -> RawImage {
        self.state = CaptureState::Captured {
            final_image: FinalImage::from(&raw),
            raw: raw.clone(),
        };
        raw
    }
}
